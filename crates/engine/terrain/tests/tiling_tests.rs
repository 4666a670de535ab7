//! Tiling scheme behaviour
//!
//! Verifies tile counts, rectangle partitioning and the position to tile
//! mapping for both projections

use std::f64::consts::{FRAC_PI_2, PI};

use globe_terrain::{
    Cartographic, Ellipsoid, Rectangle, TerrainError, TileAddress, TilingScheme, TilingSchemeKind,
    WebMercatorProjection,
};

const EPSILON: f64 = 1e-9;

fn schemes() -> [TilingScheme; 2] {
    [
        TilingScheme::geographic(Ellipsoid::wgs84()),
        TilingScheme::web_mercator(Ellipsoid::wgs84()),
    ]
}

fn assert_rect_eq(a: &Rectangle, b: &Rectangle, tolerance: f64) {
    assert!(
        (a.west - b.west).abs() <= tolerance
            && (a.south - b.south).abs() <= tolerance
            && (a.east - b.east).abs() <= tolerance
            && (a.north - b.north).abs() <= tolerance,
        "{:?} != {:?}",
        a,
        b
    );
}

#[test]
fn test_counts_double_per_level() {
    for scheme in schemes() {
        let (root_x, root_y) = scheme.root_tiles();
        for level in 0..20 {
            let nx = scheme.number_of_x_tiles_at_level(level).unwrap();
            let ny = scheme.number_of_y_tiles_at_level(level).unwrap();
            assert_eq!(nx, root_x << level);
            assert_eq!(ny, root_y << level);
            assert_eq!(scheme.number_of_x_tiles_at_level(level + 1).unwrap(), nx * 2);
            assert_eq!(scheme.number_of_y_tiles_at_level(level + 1).unwrap(), ny * 2);
        }
    }
}

#[test]
fn test_invalid_level_reported() {
    for scheme in schemes() {
        assert_eq!(
            scheme.tile_xy_to_rectangle(0, 0, 40),
            Err(TerrainError::InvalidLevel { level: 40 })
        );
        assert!(matches!(
            scheme.position_to_tile_xy(&Cartographic::default(), 33),
            Err(TerrainError::InvalidLevel { .. })
        ));
    }
}

#[test]
fn test_children_partition_parent() {
    for scheme in schemes() {
        for tile in [
            TileAddress::new(0, 0, 0),
            TileAddress::new(1, 0, 0),
            TileAddress::new(5, 2, 3),
            TileAddress::new(13, 6, 4),
        ] {
            let parent = scheme.tile_xy_to_native_rectangle(tile.x, tile.y, tile.level).unwrap();
            let [nw, ne, sw, se] = tile
                .children()
                .map(|c| scheme.tile_xy_to_native_rectangle(c.x, c.y, c.level).unwrap());

            let tolerance = parent.width().abs() * 1e-12;
            // Outer edges match the parent
            assert!((nw.west - parent.west).abs() <= tolerance);
            assert!((nw.north - parent.north).abs() <= tolerance);
            assert!((se.east - parent.east).abs() <= tolerance);
            assert!((se.south - parent.south).abs() <= tolerance);
            // Shared edges meet exactly
            assert_eq!(nw.east, ne.west);
            assert_eq!(sw.east, se.west);
            assert_eq!(nw.south, sw.north);
            assert_eq!(ne.south, se.north);
            // No overlap: areas add up
            let area: f64 = [nw, ne, sw, se].iter().map(|r| r.width() * r.height()).sum();
            let parent_area = parent.width() * parent.height();
            assert!((area - parent_area).abs() <= parent_area * 1e-12);
        }
    }
}

#[test]
fn test_geodetic_children_partition_parent() {
    let scheme = TilingScheme::web_mercator(Ellipsoid::wgs84());
    let tile = TileAddress::new(2, 1, 2);
    let parent = scheme.tile_rectangle(tile).unwrap();
    let children = tile.children().map(|c| scheme.tile_rectangle(c).unwrap());

    assert_rect_eq(
        &Rectangle::new(
            children[2].west,
            children[2].south,
            children[1].east,
            children[1].north,
        ),
        &parent,
        EPSILON,
    );
    assert_eq!(children[0].south, children[2].north);
    assert_eq!(children[0].east, children[1].west);
}

#[test]
fn test_web_mercator_level_zero_halves() {
    let ellipsoid = Ellipsoid::wgs84();
    let scheme = TilingScheme::web_mercator(ellipsoid);
    let extent = PI * ellipsoid.semi_major_axis();

    let west = scheme.tile_xy_to_native_rectangle(0, 0, 0).unwrap();
    let east = scheme.tile_xy_to_native_rectangle(1, 0, 0).unwrap();

    assert!((west.west + extent).abs() < 1e-6);
    assert_eq!(west.east, 0.0);
    assert_eq!(east.west, 0.0);
    assert!((east.east - extent).abs() < 1e-6);
    assert!((west.north - extent).abs() < 1e-6);
    assert!((west.south + extent).abs() < 1e-6);

    let geodetic = scheme.tile_xy_to_rectangle(1, 0, 0).unwrap();
    assert!((geodetic.north - WebMercatorProjection::MAXIMUM_LATITUDE).abs() < 1e-12);
    assert!((geodetic.east - PI).abs() < 1e-12);
}

#[test]
fn test_geographic_extent() {
    let scheme = TilingScheme::geographic(Ellipsoid::wgs84());
    assert_eq!(scheme.kind(), TilingSchemeKind::Geographic);
    assert_eq!(
        scheme.native_rectangle(),
        Rectangle::new(-PI, -FRAC_PI_2, PI, FRAC_PI_2)
    );
    assert_eq!(scheme.rectangle(), Rectangle::MAX_VALUE);
}

#[test]
fn test_out_of_range_tiles() {
    for scheme in schemes() {
        let nx = scheme.number_of_x_tiles_at_level(3).unwrap();
        let ny = scheme.number_of_y_tiles_at_level(3).unwrap();
        assert!(scheme.tile_xy_to_rectangle(nx - 1, ny - 1, 3).is_ok());
        assert_eq!(
            scheme.tile_xy_to_rectangle(nx, 0, 3),
            Err(TerrainError::TileOutOfRange {
                x: nx,
                y: 0,
                level: 3,
                max_x: nx,
                max_y: ny
            })
        );
        assert!(matches!(
            scheme.tile_xy_to_native_rectangle(0, ny, 3),
            Err(TerrainError::TileOutOfRange { .. })
        ));
    }
}

#[test]
fn test_position_maps_back_to_tile() {
    for scheme in schemes() {
        for level in [0, 1, 4, 9] {
            let nx = scheme.number_of_x_tiles_at_level(level).unwrap();
            let ny = scheme.number_of_y_tiles_at_level(level).unwrap();
            for (x, y) in [(0, 0), (nx - 1, ny - 1), (nx / 3, ny / 2), (nx / 2, 0)] {
                let rect = scheme.tile_xy_to_rectangle(x, y, level).unwrap();
                for (s, t) in [(0.5, 0.5), (0.1, 0.9), (0.9, 0.1)] {
                    let position = rect.interpolate(s, t);
                    let tile = scheme.position_to_tile_xy(&position, level).unwrap();
                    assert_eq!(tile, TileAddress::new(x, y, level));
                }
            }
        }
    }
}

#[test]
fn test_boundary_goes_to_lower_index() {
    let scheme = TilingScheme::geographic(Ellipsoid::wgs84());

    // Prime meridian separates the two level-0 tiles
    let on_meridian = Cartographic::new(0.0, 0.3, 0.0);
    assert_eq!(
        scheme.position_to_tile_xy(&on_meridian, 0).unwrap(),
        TileAddress::new(0, 0, 0)
    );

    // Equator separates rows 0 and 1 at level 1
    let on_equator = Cartographic::new(0.5, 0.0, 0.0);
    assert_eq!(
        scheme.position_to_tile_xy(&on_equator, 1).unwrap(),
        TileAddress::new(2, 0, 1)
    );

    let scheme = TilingScheme::web_mercator(Ellipsoid::wgs84());
    let origin = Cartographic::new(0.0, 0.0, 0.0);
    assert_eq!(
        scheme.position_to_tile_xy(&origin, 1).unwrap(),
        TileAddress::new(1, 0, 1)
    );
}

#[test]
fn test_tile_edges_go_to_lower_index() {
    for scheme in schemes() {
        for level in [3, 5, 7, 10] {
            let nx = scheme.number_of_x_tiles_at_level(level).unwrap();
            let ny = scheme.number_of_y_tiles_at_level(level).unwrap();
            let step_x = (nx / 64).max(1) as usize;
            let step_y = (ny / 32).max(1) as usize;
            for x in (1..nx).step_by(step_x) {
                for y in (1..ny).step_by(step_y) {
                    let rect = scheme.tile_xy_to_rectangle(x, y, level).unwrap();
                    let middle = rect.center();

                    let on_west = Cartographic::new(rect.west, middle.latitude, 0.0);
                    assert_eq!(
                        scheme.position_to_tile_xy(&on_west, level).unwrap(),
                        TileAddress::new(x - 1, y, level),
                        "{:?} west edge of {}/{}/{}",
                        scheme.kind(),
                        level,
                        x,
                        y
                    );

                    let on_north = Cartographic::new(middle.longitude, rect.north, 0.0);
                    assert_eq!(
                        scheme.position_to_tile_xy(&on_north, level).unwrap(),
                        TileAddress::new(x, y - 1, level),
                        "{:?} north edge of {}/{}/{}",
                        scheme.kind(),
                        level,
                        x,
                        y
                    );
                }
            }
        }
    }
}

#[test]
fn test_outside_extent_clamps() {
    let scheme = TilingScheme::web_mercator(Ellipsoid::wgs84());
    let level = 3;
    let nx = scheme.number_of_x_tiles_at_level(level).unwrap();
    let ny = scheme.number_of_y_tiles_at_level(level).unwrap();

    let north_pole = Cartographic::new(0.3, FRAC_PI_2, 0.0);
    assert_eq!(scheme.position_to_tile_xy(&north_pole, level).unwrap().y, 0);

    let south_pole = Cartographic::new(0.3, -FRAC_PI_2, 0.0);
    assert_eq!(
        scheme.position_to_tile_xy(&south_pole, level).unwrap().y,
        ny - 1
    );

    // Longitudes past the anti-meridian wrap around
    let wrapped = Cartographic::new(PI + 0.01, 0.2, 0.0);
    assert_eq!(scheme.position_to_tile_xy(&wrapped, level).unwrap().x, 0);
    let east_edge = Cartographic::new(PI, 0.2, 0.0);
    assert_eq!(
        scheme.position_to_tile_xy(&east_edge, level).unwrap().x,
        nx - 1
    );
}

#[test]
fn test_non_finite_position_rejected() {
    for scheme in schemes() {
        for position in [
            Cartographic::new(f64::NAN, 0.0, 0.0),
            Cartographic::new(0.0, f64::INFINITY, 0.0),
        ] {
            assert!(matches!(
                scheme.position_to_tile_xy(&position, 2),
                Err(TerrainError::InvalidInput(_))
            ));
        }
    }
}
