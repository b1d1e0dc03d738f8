//! Shared corpora and fixtures for integration tests.
//!
//! # Available Fixtures
//!
//! - `scenario`: the two-document linear algebra corpus used by ranking tests
//! - `site`: a small documentation site with notebooks, theory pages and API objects

#![allow(dead_code)] // Each integration test crate uses a subset

use docindex::{DocumentRecord, Index, IndexBuilder, ObjectRecord};
use rstest::fixture;

/// Builds a document record without objects.
pub fn doc(filename: &str, title: &str, body: &str) -> DocumentRecord {
    DocumentRecord {
        filename: filename.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        objects: vec![],
    }
}

pub fn object(name: &str, domain: &str, anchor: &str) -> ObjectRecord {
    ObjectRecord {
        name: name.to_string(),
        domain: domain.to_string(),
        anchor: anchor.to_string(),
    }
}

/// `a.md` mentions matrices in its body; `b.md` also owns an `invertMatrix` object.
pub fn scenario_records() -> Vec<DocumentRecord> {
    vec![
        doc("a.md", "Linear Algebra", "vectors and matrices"),
        DocumentRecord {
            objects: vec![object("invertMatrix", "function", "#fn1")],
            ..doc("b.md", "Notes", "matrix inversion example")
        },
    ]
}

pub fn site_records() -> Vec<DocumentRecord> {
    vec![
        doc(
            "FrontPage.md",
            "Underworld 3",
            "Finite element models of geodynamics. Start with the notebooks or the theory pages.",
        ),
        doc(
            "Theory/LinearAlgebra.md",
            "Linear Algebra",
            "Sparse matrices, vectors and iterative solvers used by the finite element method.",
        ),
        DocumentRecord {
            objects: vec![
                object("SNES_Stokes", "py:class", ""),
                object("SNES_Stokes.solve", "py:method", ""),
                object("SNES_Stokes.petsc_options", "py:attribute", "-"),
            ],
            ..doc(
                "Notebooks/Ex_Stokes.ipynb",
                "Stokes flow in a box",
                "Solve the Stokes equations for a viscous fluid and plot the velocity field.",
            )
        },
        DocumentRecord {
            objects: vec![
                object("MeshVariable", "py:class", "uw.discretisation.MeshVariable"),
                object("Swarm", "py:class", "uw.swarm.Swarm"),
            ],
            ..doc(
                "Notebooks/Ex_Swarms.ipynb",
                "Swarms and mesh variables",
                "Particles carry material properties; mesh variables store the solution.",
            )
        },
        doc(
            "Glossary.md",
            "Glossary",
            "Stokes flow: creeping flow with negligible inertia. Storage: where checkpoints live.",
        ),
    ]
}

/// Routes build and query logs through the test writer.
pub fn init_logging() {
    docindex::logging::init();
}

#[fixture]
pub fn scenario() -> Index {
    init_logging();
    IndexBuilder::default().build(scenario_records()).unwrap()
}

#[fixture]
pub fn site() -> Index {
    init_logging();
    IndexBuilder::default().build(site_records()).unwrap()
}
