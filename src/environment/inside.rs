//! "Am I in a container?" detection. Detectors run in a fixed order; the first match wins, so
//! the specific ones (orchestrators) come before the generic ones (plain runtimes, cgroup
//! heuristics).

use super::Environment;
use super::checks::{
    extract_container_id, extract_pod_uid, is_kubernetes_cgroup, matches_container_cgroup,
};
use crate::detector::RuntimeType;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// What an inside detector found out about the current process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inside {
    pub runtime: RuntimeType,
    /// [`RuntimeType::None`] when no orchestrator manages the container.
    pub orchestrator: RuntimeType,
    pub container_id: Option<String>,
    pub workload_id: Option<String>,
    pub workload_name: Option<String>,
    pub namespace: Option<String>,
}

impl Inside {
    fn new(runtime: RuntimeType, env: &Environment) -> Self {
        Self {
            runtime,
            orchestrator: RuntimeType::None,
            container_id: extract_container_id(&env.self_cgroup()),
            workload_id: None,
            workload_name: None,
            namespace: None,
        }
    }

    fn orchestrated(runtime: RuntimeType, env: &Environment) -> Self {
        Self {
            orchestrator: runtime,
            ..Self::new(runtime, env)
        }
    }
}

type InsideDetector = fn(&Environment) -> Option<Inside>;

static DETECTORS: &[(&str, InsideDetector)] = &[
    ("kubernetes", kubernetes),
    ("aws-fargate", aws_fargate),
    ("aws-ecs", aws_ecs),
    ("nomad", nomad),
    ("systemd-nspawn", systemd_nspawn),
    ("podman", podman),
    ("docker", docker),
    ("containerd", containerd),
    ("cri-o", crio),
    ("lxc", lxc),
    ("cgroup", cgroup_heuristics),
];

/// Runs the detectors in order and returns the first match.
pub fn detect_inside(env: &Environment) -> Option<Inside> {
    DETECTORS.iter().find_map(|(name, detect)| {
        log::trace!("Running inside detector: {name}");
        let inside = detect(env)?;
        log::debug!("Inside detection matched: {name} ({})", inside.runtime);
        Some(inside)
    })
}

/// GKE and AKS are told apart from vanilla Kubernetes by their well-known markers.
fn kubernetes_flavor(env: &Environment) -> RuntimeType {
    let gke = ["GKE_CLUSTER_NAME", "CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT"]
        .iter()
        .any(|var| env.has_var(var))
        || env.exists("/var/run/secrets/google");
    if gke {
        return RuntimeType::GoogleGke;
    }

    let aks = ["AKS_NODE_NAME", "AZURE_CLIENT_ID"]
        .iter()
        .any(|var| env.has_var(var))
        || env.exists("/var/run/secrets/azure")
        || env.exists("/etc/kubernetes/azure.json");
    if aks {
        return RuntimeType::AzureAks;
    }

    RuntimeType::Kubernetes
}

fn kubernetes(env: &Environment) -> Option<Inside> {
    let cgroup = env.self_cgroup();
    let in_pod = env.has_var("KUBERNETES_SERVICE_HOST")
        || env.exists(&format!("{SERVICE_ACCOUNT_DIR}/token"))
        || is_kubernetes_cgroup(&cgroup);
    if !in_pod {
        return None;
    }

    Some(Inside {
        runtime: RuntimeType::Kubernetes,
        orchestrator: kubernetes_flavor(env),
        container_id: extract_container_id(&cgroup),
        workload_id: env
            .var("POD_UID")
            .map(str::to_owned)
            .or_else(|| extract_pod_uid(&cgroup)),
        workload_name: env.var("POD_NAME").or(env.var("HOSTNAME")).map(str::to_owned),
        namespace: env
            .var("POD_NAMESPACE")
            .map(str::to_owned)
            .or_else(|| env.read_trimmed(&format!("{SERVICE_ACCOUNT_DIR}/namespace"))),
    })
}

fn aws_fargate(env: &Environment) -> Option<Inside> {
    env.var("AWS_EXECUTION_ENV")
        .filter(|exec_env| exec_env.to_ascii_lowercase().contains("fargate"))
        .map(|_| Inside::orchestrated(RuntimeType::AwsFargate, env))
}

fn aws_ecs(env: &Environment) -> Option<Inside> {
    [
        "ECS_CONTAINER_METADATA_URI_V4",
        "ECS_CONTAINER_METADATA_URI",
        "ECS_AGENT_URI",
    ]
    .iter()
    .any(|var| env.has_var(var))
    .then(|| Inside {
        namespace: env.var("ECS_CLUSTER").map(str::to_owned),
        ..Inside::orchestrated(RuntimeType::AwsEcs, env)
    })
}

fn nomad(env: &Environment) -> Option<Inside> {
    let alloc_id = env.var("NOMAD_ALLOC_ID")?;
    Some(Inside {
        workload_id: Some(alloc_id.to_owned()),
        workload_name: env
            .var("NOMAD_TASK_NAME")
            .or(env.var("NOMAD_JOB_NAME"))
            .map(str::to_owned),
        namespace: env.var("NOMAD_NAMESPACE").map(str::to_owned),
        ..Inside::orchestrated(RuntimeType::Nomad, env)
    })
}

fn machine_name(env: &Environment) -> Option<String> {
    env.var("HOSTNAME")
        .map(str::to_owned)
        .or_else(|| env.read_trimmed("/etc/hostname"))
        .filter(|name| !name.is_empty())
}

fn systemd_nspawn(env: &Environment) -> Option<Inside> {
    let nspawn = env.read_trimmed("/run/host/container-manager").as_deref() == Some("systemd-nspawn")
        || env.container_marker().as_deref() == Some("systemd-nspawn");
    nspawn.then(|| Inside {
        container_id: machine_name(env),
        ..Inside::new(RuntimeType::SystemdNspawn, env)
    })
}

/// Reads `key="value"` from podman's `/run/.containerenv`.
fn containerenv_value(contents: &str, key: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let value = line.strip_prefix(key)?.strip_prefix('=')?;
        let value = value.trim_matches('"');
        (!value.is_empty()).then(|| value.to_owned())
    })
}

fn podman(env: &Environment) -> Option<Inside> {
    let containerenv = env.read_trimmed("/run/.containerenv");
    if containerenv.is_none() && env.container_marker().as_deref() != Some("podman") {
        return None;
    }

    let mut inside = Inside::new(RuntimeType::Podman, env);
    if let Some(contents) = containerenv {
        if let Some(id) = containerenv_value(&contents, "id") {
            inside.container_id = Some(id);
        }
        inside.workload_name = containerenv_value(&contents, "name");
    }
    Some(inside)
}

fn docker(env: &Environment) -> Option<Inside> {
    (env.exists("/.dockerenv") || env.self_cgroup().contains("docker"))
        .then(|| Inside::new(RuntimeType::Docker, env))
}

fn containerd(env: &Environment) -> Option<Inside> {
    env.self_cgroup()
        .contains("containerd")
        .then(|| Inside::new(RuntimeType::Containerd, env))
}

fn crio(env: &Environment) -> Option<Inside> {
    env.self_cgroup()
        .contains("crio")
        .then(|| Inside::new(RuntimeType::CriO, env))
}

fn lxc(env: &Environment) -> Option<Inside> {
    (env.container_marker().as_deref() == Some("lxc"))
        .then(|| Inside::new(RuntimeType::Lxc, env))
}

fn cgroup_heuristics(env: &Environment) -> Option<Inside> {
    (matches_container_cgroup(&env.self_cgroup()) || env.container_marker().is_some())
        .then(|| Inside::new(RuntimeType::Unknown, env))
}
