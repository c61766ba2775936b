//! Save a hierarchy to JSON and load it back into a fresh manager.

use askr::prelude::*;

fn main() -> Result<(), SceneError> {
    env_logger::init();

    let mut manager = EntityManager::new();
    let level = manager.allocate()?;
    let platform = manager.allocate()?;
    manager.get_mut(level).unwrap().set_name("level");
    manager.get_mut(platform).unwrap().set_name("platform");
    manager.add_child(level, platform)?;
    manager.set_local_position(platform, Vec3::new(4.0, 1.0, 0.0), Propagate::Deferred)?;

    let path = std::env::temp_dir().join("askr_demo_scene.json");
    save_scene(&path, &manager)?;
    println!("saved scene to {}", path.display());

    let mut restored = EntityManager::new();
    let roots = load_scene(&path, &mut restored)?;
    println!(
        "loaded {} root(s); first root is {:?}",
        roots.len(),
        restored.get(roots[0]).map(|e| e.name().to_owned())
    );

    std::fs::remove_file(&path).ok();
    Ok(())
}
