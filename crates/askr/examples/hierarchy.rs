//! Build a small hierarchy, tick it a few frames, and destroy the root to
//! show orphan promotion. Run with `RUST_LOG=debug` to see cleanup logging.

use askr::prelude::*;

#[derive(Default)]
struct Spinner {
    angle: f32,
}

impl Component for Spinner {
    fn update(&mut self, dt: f32) {
        self.angle += dt;
    }

    fn transform_updated(&mut self, world: &Transform) {
        log::debug!("spinner now at {:?}", world.position);
    }
}

fn main() -> Result<(), EntityError> {
    env_logger::init();

    let mut manager = EntityManager::new();
    manager.register_component::<Spinner>();

    let sun = manager.allocate()?;
    let planet = manager.allocate()?;
    let moon = manager.allocate()?;
    manager.get_mut(sun).unwrap().set_name("sun");
    manager.get_mut(planet).unwrap().set_name("planet");
    manager.get_mut(moon).unwrap().set_name("moon");

    manager.add_child(sun, planet)?;
    manager.add_child(planet, moon)?;
    manager.attach::<Spinner>(moon)?;

    manager.set_local_position(sun, Vec3::new(5.0, 0.0, 0.0), Propagate::Deferred)?;
    manager.set_local_position(planet, Vec3::new(3.0, 0.0, 0.0), Propagate::Deferred)?;
    manager.set_local_position(moon, Vec3::new(1.0, 0.0, 0.0), Propagate::Deferred)?;

    for _ in 0..3 {
        manager.update(1.0 / 60.0);
    }

    println!(
        "moon world position: {:?}",
        manager.world_position(moon).unwrap()
    );

    // Destroying the sun promotes the planet to a root without moving it.
    manager.destroy(sun)?;
    manager.update(1.0 / 60.0);
    println!(
        "after destroying the sun: {} roots, planet at {:?}",
        manager.roots().len(),
        manager.world_position(planet).unwrap()
    );

    Ok(())
}
