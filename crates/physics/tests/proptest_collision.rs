use glam::Vec2;
use proptest::prelude::*;
use wayfarer_core::{Body, WalkableFn};
use wayfarer_physics::{CollisionResolver, MovementIntegrator};

/// Checkerboard of 1×1 cells with every third cell walled off.
fn walled(p: Vec2) -> bool {
    let (x, y) = (p.x.floor() as i64, p.y.floor() as i64);
    (x * 7 + y * 13).rem_euclid(3) != 0
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn resolved_positions_are_never_blocked(
        x in -50.0f32..50.0,
        y in -50.0f32..50.0,
        vx in -30.0f32..30.0,
        vy in -30.0f32..30.0,
        size in 0.1f32..0.9,
    ) {
        let world = WalkableFn(walled);
        let resolver = CollisionResolver::new(&world);
        let start = Vec2::new(x, y);
        prop_assume!(resolver.is_position_valid(start, size));

        let mut body = Body::new(start, size);
        body.velocity = Vec2::new(vx, vy);
        let outcome = MovementIntegrator.integrate(&mut body, 0.1, &resolver);
        prop_assert!(resolver.is_position_valid(outcome.to, size));
        prop_assert_eq!(outcome.to, body.position);
    }

    #[test]
    fn resolve_only_moves_along_proposed_axes(
        x in -50.0f32..50.0,
        y in -50.0f32..50.0,
        dx in -2.0f32..2.0,
        dy in -2.0f32..2.0,
    ) {
        let world = WalkableFn(walled);
        let resolver = CollisionResolver::new(&world);
        let body = Body::new(Vec2::new(x, y), 0.5);
        let proposed = body.position + Vec2::new(dx, dy);
        let resolved = resolver.resolve(&body, proposed);
        prop_assert!(resolved.x == body.position.x || resolved.x == proposed.x);
        prop_assert!(resolved.y == body.position.y || resolved.y == proposed.y);
    }
}
