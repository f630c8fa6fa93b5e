//! Runs a [`SimulationConfig`] end to end: mesh, problem, load stepping and output.
use crate::boundary::{DirichletBoundary, PressureBoundary};
use crate::config::{MaterialConfig, Measurement, SimulationConfig};
use crate::continuation::{LoadPath, LoadStepping, LoadTarget};
use crate::io::vtk::{step_file_name, HexMeshDataSetBuilder};
use crate::mesh::procedural::create_box_hex_mesh;
use crate::mesh::HexMesh;
use crate::nalgebra::{DVector, DVectorView, Point3, Vector3};
use crate::problem::HyperelasticProblem;
use crate::solid::materials::{
    GuccioneMaterial, HolzapfelOgdenMaterial, LameParameters, NeoHookeanMaterial, YoungPoisson,
};
use crate::solid::HyperelasticMaterial;
use eyre::{ensure, WrapErr};
use log::info;
use std::path::PathBuf;

/// Outcome of a successful simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    /// The measured quantity at zero load and after every load step.
    pub path: LoadPath<f64, f64>,
    /// Displacement at the target load.
    pub displacement: DVector<f64>,
    pub vtk_files: Vec<PathBuf>,
}

pub fn run_simulation(config: &SimulationConfig) -> eyre::Result<SimulationReport> {
    config.validate()?;
    let mesh = create_box_hex_mesh(
        Point3::from(config.mesh.min),
        Point3::from(config.mesh.max),
        config.mesh.cells,
    )
    .wrap_err("Failed to create box mesh")?;
    info!(
        "Created box mesh with {} vertices and {} cells",
        mesh.vertices().len(),
        mesh.num_cells()
    );

    match &config.material {
        MaterialConfig::NeoHookean { young, poisson } => {
            let parameters = LameParameters::from(YoungPoisson {
                young: *young,
                poisson: *poisson,
            });
            run_with_material(config, mesh, NeoHookeanMaterial, parameters)
        }
        MaterialConfig::Guccione(parameters) => run_with_material(config, mesh, GuccioneMaterial, *parameters),
        MaterialConfig::HolzapfelOgden(parameters) => {
            run_with_material(config, mesh, HolzapfelOgdenMaterial, *parameters)
        }
    }
}

/// Builds the problem described by `config` on the given mesh.
pub fn build_problem<M>(
    config: &SimulationConfig,
    mesh: HexMesh<f64>,
    material: M,
    parameters: M::Parameters,
) -> eyre::Result<HyperelasticProblem<f64, M>>
where
    M: HyperelasticMaterial<f64>,
{
    let mut problem = HyperelasticProblem::new(mesh, material, parameters)?;
    if let Some(order) = config.quadrature_order {
        problem = problem.with_quadrature_order(order)?;
    }

    for bc in &config.dirichlet {
        let nodes = problem.mesh().select_vertices(|x| bc.region.contains(x));
        ensure!(!nodes.is_empty(), "Dirichlet boundary \"{}\" selects no vertices", bc.name);
        let boundary = DirichletBoundary::new(bc.name.clone(), nodes, bc.components, Vector3::from(bc.value));
        problem = problem.with_dirichlet(boundary)?;
    }

    for bc in &config.pressure {
        let faces = problem
            .mesh()
            .select_boundary_faces(|x| bc.region.contains(x));
        ensure!(!faces.is_empty(), "Pressure boundary \"{}\" selects no boundary faces", bc.name);
        problem = problem.with_pressure(PressureBoundary::new(bc.name.clone(), faces, bc.pressure))?;
    }

    Ok(problem)
}

fn run_with_material<M>(
    config: &SimulationConfig,
    mesh: HexMesh<f64>,
    material: M,
    parameters: M::Parameters,
) -> eyre::Result<SimulationReport>
where
    M: HyperelasticMaterial<f64>,
{
    let mut problem = build_problem(config, mesh, material, parameters)?;
    let stepping = LoadStepping::new(config.load.steps)
        .with_newton_settings(config.newton)
        .with_line_search(config.line_search);
    let target = LoadTarget::new(config.load.parameter.clone(), config.load.target);
    let initial = DVector::zeros(problem.num_dofs());

    let mut vtk_files = Vec::new();
    let outcome = stepping
        .run(&mut problem, &target, initial, |problem, state| {
            let quantity = measure(problem, &config.measurement, state.displacement)?;
            if let Some(dir) = &config.output.vtk_directory {
                let path = dir.join(step_file_name(state.step));
                HexMeshDataSetBuilder::from_mesh(problem.mesh())
                    .with_title(format!("load step {}", state.step))
                    .with_point_vectors("displacement", state.displacement)
                    .try_export(&path)
                    .wrap_err_with(|| format!("Failed to export {}", path.display()))?;
                vtk_files.push(path);
            }
            Ok(quantity)
        })
        .wrap_err_with(|| {
            format!(
                "Load stepping of \"{}\" towards {} failed",
                target.parameter, target.value
            )
        })?;

    Ok(SimulationReport {
        path: outcome.path,
        displacement: outcome.displacement,
        vtk_files,
    })
}

/// Evaluates a measurement for the displacement `u`.
pub fn measure<M>(
    problem: &HyperelasticProblem<f64, M>,
    measurement: &Measurement,
    u: &DVector<f64>,
) -> eyre::Result<f64>
where
    M: HyperelasticMaterial<f64>,
{
    let u = DVectorView::from(u);
    match measurement {
        Measurement::Displacement { point, component } => {
            let displacement = problem.sample_displacement(&u, &Point3::from(*point))?;
            Ok(displacement[*component])
        }
        Measurement::Stress {
            point,
            measure,
            row,
            col,
        } => {
            let stress = problem.sample_stress(&u, &Point3::from(*point), *measure)?;
            Ok(stress[(*row, *col)])
        }
    }
}
