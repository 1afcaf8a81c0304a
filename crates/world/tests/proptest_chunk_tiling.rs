use glam::Vec2;
use proptest::prelude::*;
use wayfarer_core::WorldConfig;
use wayfarer_world::{
    generate_chunk, tile_is_walkable, ChunkGeometry, ChunkKey, ChunkPos, ExplorationLedger,
    TerrainGenerator, WorldManager, TILE_UNEXPLORED,
};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn every_position_lands_in_exactly_one_cell(
        x in -5_000.0f32..5_000.0,
        y in -5_000.0f32..5_000.0,
        tile_size in prop_oneof![Just(1.0f32), Just(0.5), Just(2.0)],
    ) {
        let geometry = ChunkGeometry::new(tile_size, 20);
        let (chunk, local) = geometry.locate(Vec2::new(x, y));
        prop_assert!(local.x < 20 && local.y < 20);

        let origin = geometry.chunk_origin(chunk);
        let span = 20.0 * tile_size;
        prop_assert!(x >= origin.x - 1e-3 && x < origin.x + span + 1e-3);
        prop_assert!(y >= origin.y - 1e-3 && y < origin.y + span + 1e-3);
    }

    #[test]
    fn chunk_keys_roundtrip_and_preserve_order(
        ax in any::<i32>(), ay in any::<i32>(),
        bx in any::<i32>(), by in any::<i32>(),
    ) {
        let a = ChunkPos::new(ax, ay);
        let b = ChunkPos::new(bx, by);
        prop_assert_eq!(ChunkKey::from_pos(a).pos(), a);
        prop_assert_eq!(a.cmp(&b), ChunkKey::from_pos(a).cmp(&ChunkKey::from_pos(b)));
    }

    #[test]
    fn generation_is_pure(seed in any::<u64>(), cx in -10_000i32..10_000, cy in -10_000i32..10_000) {
        let a = generate_chunk(seed, cx, cy);
        let b = TerrainGenerator::new(seed).generate_chunk(ChunkPos::new(cx, cy));
        prop_assert_eq!(a.tiles(), b.tiles());
    }

    #[test]
    fn fogged_border_is_unwalkable_outside_initial_area(
        seed in any::<u64>(),
        cx in 50i32..400,
        cy in -400i32..400,
        i in 0usize..20,
    ) {
        let chunk = generate_chunk(seed, cx, cy);
        for (x, y) in [(i, 0), (i, 19), (0, i), (19, i)] {
            prop_assert_eq!(chunk.tile(x, y), TILE_UNEXPLORED);
            prop_assert!(!tile_is_walkable(chunk.tile(x, y)));
        }
    }

    #[test]
    fn marking_commutes(
        marks in prop::collection::vec((-20i32..20, -20i32..20), 0..40),
    ) {
        let mut forward = ExplorationLedger::new(TerrainGenerator::new(1));
        let mut backward = ExplorationLedger::new(TerrainGenerator::new(1));
        forward.mark_all(marks.iter().map(|&(x, y)| ChunkPos::new(x, y)));
        backward.mark_all(marks.iter().rev().map(|&(x, y)| ChunkPos::new(x, y)));
        prop_assert_eq!(forward.explored_snapshot(), backward.explored_snapshot());
    }

    #[test]
    fn generated_but_unexplored_chunks_are_never_walkable(
        seed in any::<u64>(),
        cx in -200i32..200,
        cy in -200i32..200,
        fx in 0.0f32..0.99,
        fy in 0.0f32..0.99,
    ) {
        let mut world = WorldManager::new(WorldConfig { seed, ..WorldConfig::default() });
        let pos = ChunkPos::new(cx, cy);
        world.ledger_mut().get_chunk(pos);

        let span = world.geometry().chunk_size as f32 * world.geometry().tile_size;
        let position = world.geometry().chunk_origin(pos) + Vec2::new(fx, fy) * span;
        prop_assert_eq!(world.geometry().chunk_of(position), pos);
        prop_assert_eq!(world.tile_at(position), TILE_UNEXPLORED);
        prop_assert!(!world.is_walkable(position));
    }
}
