//! Typed manifest builders for the probe pipeline's deployment half,
//! grounded on the dict-literal manifests under
//! `chaosgarden/k8s/probe/resources/` but expressed as `k8s-openapi`
//! structs instead of Jinja-ish dicts — the idiomatic shape for a
//! `kube`-based Rust client.

use std::collections::BTreeMap;

use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhook, MutatingWebhookConfiguration, ServiceReference, WebhookClientConfig,
};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, Namespace, PodSpec, PodTemplateSpec, Secret, Service, ServiceAccount, ServicePort, ServiceSpec,
};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::ByteString;

const APP_LABEL: &str = "app.kubernetes.io/name";
const COMPONENT: &str = "gardenchaos-probe";

fn labels() -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), COMPONENT.to_string())])
}

fn meta(namespace: Option<&str>, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        labels: Some(labels()),
        ..Default::default()
    }
}

pub fn namespace(name: &str) -> Namespace {
    Namespace { metadata: meta(None, name), ..Default::default() }
}

pub fn service_account(namespace_name: &str) -> ServiceAccount {
    ServiceAccount { metadata: meta(Some(namespace_name), "gardenchaos-probe"), ..Default::default() }
}

/// Grants read access to pods/nodes/leases and full access to the
/// heartbeat CRDs — the minimum the in-cluster probes need to report and
/// the webhook needs to challenge, per spec.md §6's Kubernetes contract.
pub fn cluster_role() -> ClusterRole {
    ClusterRole {
        metadata: meta(None, "gardenchaos-probe"),
        rules: Some(vec![
            PolicyRule {
                api_groups: Some(vec!["".to_string()]),
                resources: Some(vec!["pods".to_string(), "nodes".to_string()]),
                verbs: vec!["get".to_string(), "list".to_string(), "watch".to_string()],
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec!["coordination.k8s.io".to_string()]),
                resources: Some(vec!["leases".to_string()]),
                verbs: vec!["get".to_string(), "list".to_string(), "watch".to_string()],
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec!["chaos.gardener.cloud".to_string()]),
                resources: Some(vec!["heartbeats".to_string(), "acknowledgedheartbeats".to_string()]),
                verbs: vec!["get".to_string(), "list".to_string(), "watch".to_string(), "create".to_string(), "delete".to_string()],
                ..Default::default()
            },
        ]),
        ..Default::default()
    }
}

pub fn cluster_role_binding(namespace_name: &str) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: meta(None, "gardenchaos-probe"),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: "gardenchaos-probe".to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: "gardenchaos-probe".to_string(),
            namespace: Some(namespace_name.to_string()),
            ..Default::default()
        }]),
    }
}

pub fn service(namespace_name: &str) -> Service {
    Service {
        metadata: meta(Some(namespace_name), "gardenchaos-probe-webhook"),
        spec: Some(ServiceSpec {
            selector: Some(labels()),
            ports: Some(vec![ServicePort { name: Some("https".to_string()), port: 443, target_port: None, ..Default::default() }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Holds the admission webhook's serving certificate, provisioned out of
/// band (certificate issuance itself is out of scope, per spec.md's
/// Non-goals — this builder only shapes the `Secret` object the deployed
/// webhook expects to mount).
pub fn tls_secret(namespace_name: &str, cert_pem: &[u8], key_pem: &[u8]) -> Secret {
    Secret {
        metadata: meta(Some(namespace_name), "gardenchaos-probe-webhook-tls"),
        type_: Some("kubernetes.io/tls".to_string()),
        data: Some(BTreeMap::from([
            ("tls.crt".to_string(), ByteString(cert_pem.to_vec())),
            ("tls.key".to_string(), ByteString(key_pem.to_vec())),
        ])),
        ..Default::default()
    }
}

pub fn mutating_webhook_configuration(namespace_name: &str, ca_bundle: &[u8]) -> MutatingWebhookConfiguration {
    MutatingWebhookConfiguration {
        metadata: meta(None, "gardenchaos-probe-webhook"),
        webhooks: Some(vec![MutatingWebhook {
            name: "webhook.gardenchaos-probe.chaos.gardener.cloud".to_string(),
            client_config: WebhookClientConfig {
                service: Some(ServiceReference {
                    namespace: namespace_name.to_string(),
                    name: "gardenchaos-probe-webhook".to_string(),
                    path: Some("/challenge".to_string()),
                    port: Some(443),
                }),
                ca_bundle: Some(ByteString(ca_bundle.to_vec())),
                url: None,
            },
            side_effects: "None".to_string(),
            admission_review_versions: vec!["v1".to_string()],
            ..Default::default()
        }]),
    }
}

/// Replica count is `max(1, zones.len())` per spec.md §4.8, so every zone
/// gets at least one probe pod replica to report from.
pub fn deployment(namespace_name: &str, image: &str, zone_count: usize) -> Deployment {
    let replicas = zone_count.max(1) as i32;
    Deployment {
        metadata: meta(Some(namespace_name), "gardenchaos-probe"),
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector { match_labels: Some(labels()), ..Default::default() },
            template: PodTemplateSpec {
                metadata: Some(meta(Some(namespace_name), "gardenchaos-probe")),
                spec: Some(PodSpec {
                    service_account_name: Some("gardenchaos-probe".to_string()),
                    containers: vec![Container { name: "probe".to_string(), image: Some(image.to_string()), ..Default::default() }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A one-shot Job that self-terminates the webhook challenger/admission
/// path once the simulation window ends, mirroring the Python original's
/// "suicidal job" cleanup mechanism for the web-hook probe.
pub fn suicidal_job(namespace_name: &str, image: &str, after_seconds: i64) -> Job {
    Job {
        metadata: meta(Some(namespace_name), "gardenchaos-probe-cleanup"),
        spec: Some(JobSpec {
            active_deadline_seconds: Some(after_seconds),
            template: PodTemplateSpec {
                metadata: Some(meta(Some(namespace_name), "gardenchaos-probe-cleanup")),
                spec: Some(PodSpec {
                    restart_policy: Some("Never".to_string()),
                    containers: vec![Container { name: "cleanup".to_string(), image: Some(image.to_string()), ..Default::default() }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
