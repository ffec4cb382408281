//! Containment identity: which runtime and orchestrator this process runs under, and which
//! runtimes are reachable on the host.

/// Coarse container runtime reported by container detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContainerRuntime {
    None = 0,
    Docker = 1,
    Podman = 2,
    Lxc = 3,
    Kubernetes = 4,
    Jail = 5,
    Unknown = 255,
}

static CONTAINER_RUNTIMES: [(ContainerRuntime, &str); 7] = [
    (ContainerRuntime::None, "none"),
    (ContainerRuntime::Docker, "docker"),
    (ContainerRuntime::Podman, "podman"),
    (ContainerRuntime::Lxc, "lxc"),
    (ContainerRuntime::Kubernetes, "kubernetes"),
    (ContainerRuntime::Jail, "jail"),
    (ContainerRuntime::Unknown, "unknown"),
];

impl ContainerRuntime {
    pub fn from_raw(raw: u8) -> Self {
        CONTAINER_RUNTIMES
            .iter()
            .find(|(runtime, _)| *runtime as u8 == raw)
            .map_or(ContainerRuntime::Unknown, |(runtime, _)| *runtime)
    }

    pub fn as_str(self) -> &'static str {
        CONTAINER_RUNTIMES
            .iter()
            .find(|(runtime, _)| *runtime == self)
            .map_or("unknown", |(_, name)| name)
    }

    pub fn name_of(raw: u8) -> &'static str {
        Self::from_raw(raw).as_str()
    }
}

impl From<RuntimeType> for ContainerRuntime {
    fn from(runtime: RuntimeType) -> Self {
        match runtime {
            RuntimeType::None => ContainerRuntime::None,
            RuntimeType::Docker | RuntimeType::DockerSwarm => ContainerRuntime::Docker,
            RuntimeType::Podman => ContainerRuntime::Podman,
            RuntimeType::Lxc | RuntimeType::Lxd => ContainerRuntime::Lxc,
            RuntimeType::Kubernetes
            | RuntimeType::OpenShift
            | RuntimeType::GoogleGke
            | RuntimeType::AzureAks => ContainerRuntime::Kubernetes,
            RuntimeType::FreeBsdJail => ContainerRuntime::Jail,
            _ => ContainerRuntime::Unknown,
        }
    }
}

/// Fine-grained runtime or orchestrator.
///
/// Values 20 through 23 are orchestrators, 40 through 43 cloud-managed orchestrators; the
/// rest are container runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RuntimeType {
    None = 0,
    Docker = 1,
    Podman = 2,
    Containerd = 3,
    CriO = 4,
    Lxc = 5,
    Lxd = 6,
    SystemdNspawn = 7,
    Firecracker = 8,
    FreeBsdJail = 9,
    Kubernetes = 20,
    Nomad = 21,
    DockerSwarm = 22,
    OpenShift = 23,
    AwsEcs = 40,
    AwsFargate = 41,
    GoogleGke = 42,
    AzureAks = 43,
    Unknown = 254,
}

static RUNTIME_TYPES: [(RuntimeType, &str); 19] = [
    (RuntimeType::None, "none"),
    (RuntimeType::Docker, "docker"),
    (RuntimeType::Podman, "podman"),
    (RuntimeType::Containerd, "containerd"),
    (RuntimeType::CriO, "cri-o"),
    (RuntimeType::Lxc, "lxc"),
    (RuntimeType::Lxd, "lxd"),
    (RuntimeType::SystemdNspawn, "systemd-nspawn"),
    (RuntimeType::Firecracker, "firecracker"),
    (RuntimeType::FreeBsdJail, "freebsd-jail"),
    (RuntimeType::Kubernetes, "kubernetes"),
    (RuntimeType::Nomad, "nomad"),
    (RuntimeType::DockerSwarm, "docker-swarm"),
    (RuntimeType::OpenShift, "openshift"),
    (RuntimeType::AwsEcs, "aws-ecs"),
    (RuntimeType::AwsFargate, "aws-fargate"),
    (RuntimeType::GoogleGke, "google-gke"),
    (RuntimeType::AzureAks, "azure-aks"),
    (RuntimeType::Unknown, "unknown"),
];

impl RuntimeType {
    pub fn from_raw(raw: u8) -> Self {
        RUNTIME_TYPES
            .iter()
            .find(|(runtime, _)| *runtime as u8 == raw)
            .map_or(RuntimeType::Unknown, |(runtime, _)| *runtime)
    }

    pub fn as_str(self) -> &'static str {
        RUNTIME_TYPES
            .iter()
            .find(|(runtime, _)| *runtime == self)
            .map_or("unknown", |(_, name)| name)
    }

    pub fn name_of(raw: u8) -> &'static str {
        Self::from_raw(raw).as_str()
    }

    pub fn is_orchestrator(self) -> bool {
        matches!(
            self,
            RuntimeType::Kubernetes
                | RuntimeType::Nomad
                | RuntimeType::DockerSwarm
                | RuntimeType::OpenShift
                | RuntimeType::AwsEcs
                | RuntimeType::AwsFargate
                | RuntimeType::GoogleGke
                | RuntimeType::AzureAks
        )
    }
}

macro_rules! impl_name_serialize {
    ($($ty:ty),*) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl serde::Serialize for $ty {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    serializer.serialize_str(self.as_str())
                }
            }
        )*
    };
}

impl_name_serialize!(ContainerRuntime, RuntimeType);

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContainerInfo {
    pub is_containerized: bool,
    pub runtime: ContainerRuntime,
    /// Empty when no id could be determined.
    pub container_id: String,
}

/// A runtime whose control socket exists on the host.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AvailableRuntime {
    pub runtime: RuntimeType,
    pub socket_path: String,
    /// Empty when the version could not be determined.
    pub version: String,
    pub is_running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RuntimeInfo {
    pub is_containerized: bool,
    pub container_runtime: RuntimeType,
    /// May differ from the runtime, e.g. Docker under Kubernetes.
    pub orchestrator: RuntimeType,
    pub container_id: String,
    /// Nomad allocation id, Kubernetes pod UID, ECS task ARN.
    pub workload_id: String,
    pub workload_name: String,
    pub namespace: String,
    pub available_runtimes: Vec<AvailableRuntime>,
}

impl RuntimeInfo {
    /// The name callers usually want to display: the runtime, or the orchestrator when the
    /// runtime itself could not be told apart. `"none"` outside a container.
    pub fn runtime_name(&self) -> &'static str {
        if !self.is_containerized {
            return RuntimeType::None.as_str();
        }
        match self.container_runtime {
            RuntimeType::None | RuntimeType::Unknown if self.orchestrator != RuntimeType::None => {
                self.orchestrator.as_str()
            }
            RuntimeType::None => RuntimeType::Unknown.as_str(),
            runtime => runtime.as_str(),
        }
    }
}
