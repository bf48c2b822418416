use fbmkit_core::{z_axis, Axis, BoundingBox, FaceId, Point3D, ShapeBuilder, ShapeSnapshot, Vector3D};
use fbmkit_recognition::{Dimensions, Feature, FeatureGeometry, FeatureId, FeatureType};

/// Through hole of radius 3 centered at (x, y, z)
pub fn hole_at(id: FeatureId, x: f64, y: f64, z: f64) -> Feature {
    let center = Point3D::new(x, y, z);
    Feature::new(
        id,
        FeatureType::HoleThrough,
        FeatureGeometry::Hole {
            face: FaceId(id),
            axis: Axis::new(center, z_axis()),
            radius: 3.0,
            through: true,
        },
        center,
        BoundingBox::from_center(center, Vector3D::new(6.0, 6.0, 10.0)),
    )
    .with_dimensions(Dimensions {
        diameter: Some(6.0),
        depth: Some(10.0),
        ..Dimensions::default()
    })
}

pub fn holes_at(points: &[(f64, f64)]) -> Vec<Feature> {
    points
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| hole_at(i as FeatureId + 1, x, y, 0.0))
        .collect()
}

/// Plate with a row of bolt holes, a blind hole and a pocket
pub fn composite_part() -> ShapeSnapshot {
    let mut b = ShapeBuilder::new().named("composite");
    b.block(Point3D::origin(), Point3D::new(120.0, 80.0, 30.0));
    for x in [20.0, 40.0, 60.0, 80.0] {
        b.hole(Point3D::new(x, 15.0, 30.0), 3.0, 30.0);
    }
    b.hole(Point3D::new(100.0, 60.0, 30.0), 5.0, 12.0);
    b.pocket((20.0, 45.0), (56.0, 65.0), 20.0, 30.0);
    b.build()
}

/// Plate with four through holes in a row along X
pub fn drilled_plate() -> ShapeSnapshot {
    let mut b = ShapeBuilder::new().named("drilled-plate");
    b.block(Point3D::origin(), Point3D::new(100.0, 60.0, 20.0));
    for x in [20.0, 40.0, 60.0, 80.0] {
        b.hole(Point3D::new(x, 30.0, 20.0), 3.0, 20.0);
    }
    b.build()
}
