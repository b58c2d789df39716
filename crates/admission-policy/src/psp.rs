//! Security-hardening mutator for PodSecurityPolicy objects.
//!
//! [`sanitize`] inspects a decoded policy/v1beta1 PodSecurityPolicy
//! specification and computes the minimal ordered JSON Patch that strips or
//! clamps fields violating a fixed security baseline. The function is total:
//! every well-formed specification produces a (possibly empty) patch,
//! malformed objects are caught earlier by [`PodSecurityPolicy::from_object`].

use json_patch::{
    jsonptr::PointerBuf, Patch, PatchOperation, RemoveOperation, ReplaceOperation,
};
use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::DecodeError;

/// Host-port interval considered safe; everything outside it gets clamped
/// or removed.
pub const HOST_PORT_MIN: i32 = 20000;
pub const HOST_PORT_MAX: i32 = 65535;

/// Volume types that survive the revocation of hostPath usage.
const SAFE_VOLUME_TYPES: [&str; 6] = [
    "configMap",
    "downwardAPI",
    "emptyDir",
    "persistentVolumeClaim",
    "secret",
    "projected",
];

struct BaselineHostPath {
    path_prefix: &'static str,
    read_only: bool,
}

/// Host paths considered safe to expose to workloads. Mostly paths required
/// by CNI plugins (Calico) and node agents.
const ALLOWED_HOST_PATHS: [BaselineHostPath; 11] = [
    BaselineHostPath { path_prefix: "/etc/hosts", read_only: false },
    BaselineHostPath { path_prefix: "/lib/modules", read_only: true },
    BaselineHostPath { path_prefix: "/var/run/calico", read_only: false },
    BaselineHostPath { path_prefix: "/var/lib/calico", read_only: false },
    BaselineHostPath { path_prefix: "/run/xtables.lock", read_only: false },
    BaselineHostPath { path_prefix: "/sys/fs/", read_only: false },
    BaselineHostPath { path_prefix: "/opt/cni/bin", read_only: false },
    BaselineHostPath { path_prefix: "/etc/cni/net.d", read_only: false },
    BaselineHostPath { path_prefix: "/var/log/calico/cni", read_only: true },
    BaselineHostPath { path_prefix: "/var/run/nodeagent", read_only: false },
    BaselineHostPath {
        path_prefix: "/usr/libexec/kubernetes/kubelet-plugins/volume/exec/nodeagent~uds",
        read_only: false,
    },
];

/// The slice of a policy/v1beta1 PodSecurityPolicy object the sanitizer
/// looks at. Unknown fields are ignored, absent fields decode to the
/// permissive zero value.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodSecurityPolicy {
    #[serde(default)]
    pub spec: PodSecurityPolicySpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PodSecurityPolicySpec {
    pub privileged: bool,
    #[serde(rename = "hostPID")]
    pub host_pid: bool,
    #[serde(rename = "hostIPC")]
    pub host_ipc: bool,
    pub host_network: bool,
    pub host_ports: Vec<HostPortRange>,
    pub allowed_capabilities: Vec<String>,
    pub allowed_unsafe_sysctls: Vec<String>,
    pub volumes: Vec<String>,
    pub allowed_host_paths: Vec<AllowedHostPath>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostPortRange {
    pub min: i32,
    pub max: i32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AllowedHostPath {
    pub path_prefix: String,
    #[serde(default)]
    pub read_only: bool,
}

impl PodSecurityPolicy {
    /// Decodes the raw object embedded in an admission request.
    pub fn from_object(object: Option<&RawExtension>) -> Result<Self, DecodeError> {
        let raw = object.ok_or(DecodeError::MissingObject)?;
        serde_json::from_value(raw.0.clone()).map_err(DecodeError::InvalidObject)
    }
}

/// Computes the hardening patch for `spec`.
///
/// Each rule contributes at most one operation, in a fixed order, and all
/// operations target disjoint paths. hostNetwork is deliberately left
/// untouched.
pub fn sanitize(spec: &PodSecurityPolicySpec) -> Patch {
    let mut operations = Vec::new();

    if spec.privileged {
        operations.push(remove(["spec", "privileged"]));
    }
    if spec.host_pid {
        operations.push(remove(["spec", "hostPID"]));
    }
    if spec.host_ipc {
        operations.push(remove(["spec", "hostIPC"]));
    }
    if let Some(operation) = sanitize_host_ports(&spec.host_ports) {
        operations.push(operation);
    }
    if !spec.allowed_capabilities.is_empty() {
        operations.push(remove(["spec", "allowedCapabilities"]));
    }
    if !spec.allowed_unsafe_sysctls.is_empty() {
        operations.push(remove(["spec", "allowedUnsafeSysctls"]));
    }
    if let Some(operation) = sanitize_host_path_volumes(spec) {
        operations.push(operation);
    }

    Patch(operations)
}

/// Widest-range-wins-then-clamp, else deny-all.
///
/// A patch is warranted only when some range leaves the safe interval. In
/// that case a single range covering the whole interval is clamped to it,
/// superseding every other range; with no covering range the permission is
/// removed entirely, since an arbitrary combination of out-of-band ranges
/// cannot be narrowed safely.
fn sanitize_host_ports(ranges: &[HostPortRange]) -> Option<PatchOperation> {
    if ranges.is_empty() {
        return None;
    }

    let restricted = ranges
        .iter()
        .any(|range| range.min < HOST_PORT_MIN || range.max > HOST_PORT_MAX);
    if !restricted {
        return None;
    }

    let covering = ranges
        .iter()
        .any(|range| range.min <= HOST_PORT_MIN && range.max >= HOST_PORT_MAX);
    if covering {
        Some(replace(
            ["spec", "hostPorts"],
            json!([{ "min": HOST_PORT_MIN, "max": HOST_PORT_MAX }]),
        ))
    } else {
        Some(remove(["spec", "hostPorts"]))
    }
}

/// Revokes hostPath volume usage unless every declared host path sits in
/// the baseline. Note the patch target: the whole volumes list is replaced
/// with the safe set, the allowedHostPaths list itself is left alone.
fn sanitize_host_path_volumes(spec: &PodSecurityPolicySpec) -> Option<PatchOperation> {
    if !host_path_in_volumes(&spec.volumes) {
        return None;
    }

    let all_in_baseline = !spec.allowed_host_paths.is_empty()
        && spec
            .allowed_host_paths
            .iter()
            .all(path_in_allowed_host_paths);
    if all_in_baseline {
        return None;
    }

    Some(replace(["spec", "volumes"], json!(SAFE_VOLUME_TYPES)))
}

fn host_path_in_volumes(volumes: &[String]) -> bool {
    volumes
        .iter()
        .any(|volume| volume == "hostPath" || volume == "*")
}

fn path_in_allowed_host_paths(path: &AllowedHostPath) -> bool {
    ALLOWED_HOST_PATHS.iter().any(|allowed| {
        allowed.path_prefix == path.path_prefix && allowed.read_only == path.read_only
    })
}

fn remove<const N: usize>(tokens: [&str; N]) -> PatchOperation {
    PatchOperation::Remove(RemoveOperation {
        path: PointerBuf::from_tokens(tokens),
    })
}

fn replace<const N: usize>(tokens: [&str; N], value: serde_json::Value) -> PatchOperation {
    PatchOperation::Replace(ReplaceOperation {
        path: PointerBuf::from_tokens(tokens),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use rstest::*;

    fn spec_with_host_ports(ranges: &[(i32, i32)]) -> PodSecurityPolicySpec {
        PodSecurityPolicySpec {
            host_ports: ranges
                .iter()
                .map(|(min, max)| HostPortRange {
                    min: *min,
                    max: *max,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn patch_json(patch: &Patch) -> serde_json::Value {
        serde_json::to_value(patch).expect("patch serialization should work")
    }

    #[test]
    fn pristine_spec_produces_no_patch() {
        assert!(sanitize(&PodSecurityPolicySpec::default()).0.is_empty());
    }

    #[test]
    fn boolean_escalation_flags_are_removed() {
        let spec = PodSecurityPolicySpec {
            privileged: true,
            host_pid: true,
            host_ipc: true,
            ..Default::default()
        };

        assert_json_eq!(
            patch_json(&sanitize(&spec)),
            json!([
                { "op": "remove", "path": "/spec/privileged" },
                { "op": "remove", "path": "/spec/hostPID" },
                { "op": "remove", "path": "/spec/hostIPC" },
            ])
        );
    }

    #[test]
    fn host_network_is_left_permissive() {
        let spec = PodSecurityPolicySpec {
            host_network: true,
            ..Default::default()
        };

        assert!(sanitize(&spec).0.is_empty());
    }

    #[rstest]
    #[case::no_ranges(vec![], None)]
    #[case::in_bounds(vec![(25000, 30000)], None)]
    #[case::exactly_the_baseline(vec![(20000, 65535)], None)]
    #[case::out_of_bounds_narrow(vec![(10, 30)], Some("remove"))]
    #[case::covering(vec![(0, 100000)], Some("replace"))]
    #[case::covering_among_disjoint(vec![(20000, 65535), (10, 30)], Some("replace"))]
    #[case::disjoint_out_of_bounds(vec![(10, 30), (70000, 80000)], Some("remove"))]
    fn host_ports_clamping(#[case] ranges: Vec<(i32, i32)>, #[case] expected: Option<&str>) {
        let patch = sanitize(&spec_with_host_ports(&ranges));

        match expected {
            None => assert!(patch.0.is_empty()),
            Some("remove") => assert_json_eq!(
                patch_json(&patch),
                json!([{ "op": "remove", "path": "/spec/hostPorts" }])
            ),
            Some("replace") => assert_json_eq!(
                patch_json(&patch),
                json!([{
                    "op": "replace",
                    "path": "/spec/hostPorts",
                    "value": [{ "min": 20000, "max": 65535 }],
                }])
            ),
            Some(other) => panic!("unexpected expectation {other}"),
        }
    }

    #[test]
    fn capabilities_and_sysctls_are_removed_when_non_empty() {
        let spec = PodSecurityPolicySpec {
            allowed_capabilities: vec!["NET_ADMIN".to_owned()],
            allowed_unsafe_sysctls: vec!["kernel.msg*".to_owned()],
            ..Default::default()
        };

        assert_json_eq!(
            patch_json(&sanitize(&spec)),
            json!([
                { "op": "remove", "path": "/spec/allowedCapabilities" },
                { "op": "remove", "path": "/spec/allowedUnsafeSysctls" },
            ])
        );
    }

    fn spec_with_volumes(volumes: &[&str], host_paths: &[(&str, bool)]) -> PodSecurityPolicySpec {
        PodSecurityPolicySpec {
            volumes: volumes.iter().map(|v| v.to_string()).collect(),
            allowed_host_paths: host_paths
                .iter()
                .map(|(path_prefix, read_only)| AllowedHostPath {
                    path_prefix: path_prefix.to_string(),
                    read_only: *read_only,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[rstest]
    #[case::no_host_path(&["configMap", "secret"], &[("/tmp", false)], false)]
    #[case::host_path_no_declared_paths(&["hostPath"], &[], true)]
    #[case::wildcard_volume_no_declared_paths(&["*"], &[], true)]
    #[case::host_path_in_baseline(&["hostPath"], &[("/etc/hosts", false)], false)]
    #[case::read_only_flag_must_match(&["hostPath"], &[("/lib/modules", false)], true)]
    #[case::host_path_outside_baseline(&["hostPath"], &[("/tmp", false)], true)]
    #[case::one_bad_path_revokes(&["hostPath"], &[("/etc/hosts", false), ("/tmp", false)], true)]
    fn host_path_volume_revocation(
        #[case] volumes: &[&str],
        #[case] host_paths: &[(&str, bool)],
        #[case] patched: bool,
    ) {
        let patch = sanitize(&spec_with_volumes(volumes, host_paths));

        if patched {
            assert_json_eq!(
                patch_json(&patch),
                json!([{
                    "op": "replace",
                    "path": "/spec/volumes",
                    "value": [
                        "configMap",
                        "downwardAPI",
                        "emptyDir",
                        "persistentVolumeClaim",
                        "secret",
                        "projected",
                    ],
                }])
            );
        } else {
            assert!(patch.0.is_empty());
        }
    }

    // Documented quirk, carried over on purpose: a disallowed host path
    // revokes hostPath volume usage wholesale by patching /spec/volumes.
    // The offending allowedHostPaths list itself is left in place.
    #[test]
    fn host_path_rule_patches_volumes_not_allowed_host_paths() {
        let spec = spec_with_volumes(&["hostPath"], &[("/tmp", false)]);

        let patch = sanitize(&spec);

        assert_eq!(patch.0.len(), 1);
        let operation = patch_json(&patch)[0].clone();
        assert_eq!(operation["path"], "/spec/volumes");
        assert!(patch_json(&patch)
            .as_array()
            .unwrap()
            .iter()
            .all(|op| op["path"] != "/spec/allowedHostPaths"));
    }

    #[test]
    fn rules_fire_in_fixed_order() {
        let spec = PodSecurityPolicySpec {
            privileged: true,
            host_ports: vec![HostPortRange { min: 0, max: 99999 }],
            ..Default::default()
        };

        assert_json_eq!(
            patch_json(&sanitize(&spec)),
            json!([
                { "op": "remove", "path": "/spec/privileged" },
                {
                    "op": "replace",
                    "path": "/spec/hostPorts",
                    "value": [{ "min": 20000, "max": 65535 }],
                },
            ])
        );
    }

    #[test]
    fn sanitizing_a_sanitized_spec_is_a_fixed_point() {
        let policy = PodSecurityPolicy {
            spec: PodSecurityPolicySpec {
                privileged: true,
                host_pid: true,
                host_ipc: true,
                host_network: true,
                host_ports: vec![HostPortRange { min: 0, max: 99999 }],
                allowed_capabilities: vec!["SYS_ADMIN".to_owned()],
                allowed_unsafe_sysctls: vec!["net.*".to_owned()],
                volumes: vec!["hostPath".to_owned(), "secret".to_owned()],
                allowed_host_paths: vec![AllowedHostPath {
                    path_prefix: "/tmp".to_owned(),
                    read_only: false,
                }],
            },
        };

        let patch = sanitize(&policy.spec);
        assert!(!patch.0.is_empty());

        let mut document =
            serde_json::to_value(&policy).expect("policy serialization should work");
        json_patch::patch(&mut document, &patch).expect("patch should apply");

        let patched: PodSecurityPolicy =
            serde_json::from_value(document).expect("patched policy should decode");
        assert!(sanitize(&patched.spec).0.is_empty());
    }

    #[test]
    fn decode_rejects_missing_and_malformed_objects() {
        assert!(matches!(
            PodSecurityPolicy::from_object(None),
            Err(crate::errors::DecodeError::MissingObject)
        ));

        let raw = RawExtension(json!({ "spec": { "privileged": "not-a-bool" } }));
        assert!(matches!(
            PodSecurityPolicy::from_object(Some(&raw)),
            Err(crate::errors::DecodeError::InvalidObject(_))
        ));
    }

    #[test]
    fn decode_defaults_absent_fields() {
        let raw = RawExtension(json!({
            "apiVersion": "policy/v1beta1",
            "kind": "PodSecurityPolicy",
            "metadata": { "name": "restricted" },
            "spec": { "privileged": true },
        }));

        let policy = PodSecurityPolicy::from_object(Some(&raw)).unwrap();
        assert!(policy.spec.privileged);
        assert!(!policy.spec.host_pid);
        assert!(policy.spec.host_ports.is_empty());
        assert!(policy.spec.volumes.is_empty());
    }
}
