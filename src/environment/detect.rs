use super::available::{AvailableRuntime, available_runtimes};
use super::inside::{Inside, detect_inside};
use super::Environment;
use crate::detector::{ContainerRuntime, RuntimeType};

/// Coarse containment answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDetection {
    pub is_containerized: bool,
    pub runtime: ContainerRuntime,
    pub container_id: Option<String>,
}

/// Full runtime picture: where we run, and what else runs on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDetection {
    pub inside: Option<Inside>,
    pub available: Vec<AvailableRuntime>,
}

/// Detects whether the current process runs in a container.
///
/// Orchestrators are reported through the coarse [`ContainerRuntime`] they map to.
pub fn detect_container(env: &Environment) -> ContainerDetection {
    match detect_inside(env) {
        Some(inside) => ContainerDetection {
            is_containerized: true,
            runtime: ContainerRuntime::from(inside.runtime),
            container_id: inside.container_id,
        },
        None => ContainerDetection {
            is_containerized: false,
            runtime: ContainerRuntime::None,
            container_id: None,
        },
    }
}

pub fn detect_runtime(env: &Environment) -> RuntimeDetection {
    let inside = detect_inside(env);
    let available = available_runtimes(env);
    log::debug!(
        "Runtime detection: inside={:?}, {} runtime(s) available",
        inside.as_ref().map(|inside| inside.runtime),
        available.len()
    );
    RuntimeDetection { inside, available }
}

impl RuntimeDetection {
    pub fn is_containerized(&self) -> bool {
        self.inside.is_some()
    }

    pub fn container_runtime(&self) -> RuntimeType {
        self.inside
            .as_ref()
            .map_or(RuntimeType::None, |inside| inside.runtime)
    }
}
