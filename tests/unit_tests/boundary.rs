use hyperstep::boundary::{DirichletBoundary, Load, LoadKind, ParameterError, PressureBoundary};
use hyperstep::nalgebra::Vector3;

#[test]
fn load_scaling_preserves_kind() {
    let scalar = Load::Scalar(4.0);
    let vector = Load::Vector(Vector3::new(1.0, -2.0, 0.5));

    assert_eq!(scalar.kind(), LoadKind::Scalar);
    assert_eq!(vector.kind(), LoadKind::Vector);
    assert_eq!(scalar.scaled(0.5), Load::Scalar(2.0));
    assert_eq!(vector.scaled(2.0), Load::Vector(Vector3::new(2.0, -4.0, 1.0)));
    assert_eq!(scalar.zero_like(), Load::Scalar(0.0));
    assert_eq!(vector.zero_like(), Load::Vector(Vector3::zeros()));
    assert_eq!(vector.map(|x| x * 3.0 / 2.0), Load::Vector(Vector3::new(1.5, -3.0, 0.75)));
}

#[test]
fn load_accessors() {
    assert_eq!(Load::Scalar(1.0).as_scalar(), Some(1.0));
    assert_eq!(Load::Scalar(1.0).as_vector(), None);
    assert_eq!(Load::<f64>::Vector(Vector3::x()).as_vector(), Some(Vector3::x()));
    assert_eq!(Load::<f64>::Vector(Vector3::x()).as_scalar(), None);
}

#[test]
fn load_display() {
    assert_eq!(Load::Scalar(0.5).to_string(), "0.5");
    assert_eq!(Load::Vector(Vector3::new(1.0, 0.0, -2.5)).to_string(), "(1, 0, -2.5)");
    assert_eq!(Load::Scalar(0.004 * 3.0 / 10.0).to_string(), "0.0012");
    assert_eq!(Load::Vector(Vector3::new(0.1 + 0.2, 1e-7, 0.0)).to_string(), "(0.3, 0.0000001, 0)");
}

#[test]
fn load_json_representation() {
    let json = serde_json::to_string(&Load::Vector(Vector3::new(10.0, 0.0, 0.0))).unwrap();
    assert_eq!(json, r#"{"vector":[10.0,0.0,0.0]}"#);
    let load: Load<f64> = serde_json::from_str(r#"{"scalar":0.004}"#).unwrap();
    assert_eq!(load, Load::Scalar(0.004));
}

#[test]
fn dirichlet_constrained_dofs_follow_component_mask() {
    let bc = DirichletBoundary::new("support", vec![2, 5], [true, false, true], Vector3::new(1.0, 2.0, 3.0));
    let dofs: Vec<_> = bc.constrained_dofs().collect();
    assert_eq!(dofs, vec![(6, 1.0), (8, 3.0), (15, 1.0), (17, 3.0)]);

    let clamp = DirichletBoundary::<f64>::clamped("clamp", vec![1]);
    let dofs: Vec<_> = clamp.constrained_dofs().collect();
    assert_eq!(dofs, vec![(3, 0.0), (4, 0.0), (5, 0.0)]);
    assert_eq!(clamp.components(), [true; 3]);
}

#[test]
fn boundary_values_can_be_updated() {
    let mut bc = DirichletBoundary::<f64>::clamped("right", vec![0]);
    bc.set_value(Vector3::new(0.5, 0.0, 0.0));
    assert_eq!(bc.value(), &Vector3::new(0.5, 0.0, 0.0));
    assert_eq!(bc.name(), "right");

    let mut pressure = PressureBoundary::new("bottom", vec![[0, 1, 2, 3]], 0.0);
    pressure.set_pressure(0.004);
    assert_eq!(pressure.pressure(), 0.004);
    assert_eq!(pressure.faces(), &[[0, 1, 2, 3]]);
}

#[test]
fn parameter_error_messages() {
    let unknown = ParameterError::Unknown("top".to_string());
    assert_eq!(unknown.to_string(), "Unknown load parameter \"top\".");
    let mismatch = ParameterError::KindMismatch {
        name: "bottom".to_string(),
        expected: LoadKind::Scalar,
        found: LoadKind::Vector,
    };
    assert_eq!(
        mismatch.to_string(),
        "Load parameter \"bottom\" expects a scalar load, but a vector load was given."
    );
}
