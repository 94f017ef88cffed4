//! Topology, worker activation and the end-to-end provisioning flow.

use std::time::Duration;

use ostf_cluster::error::{ClusterError, TopologyError};
use ostf_cluster::network::{detect_network_mode, NetworkMode};
use ostf_cluster::{
    await_workers_active, default_worker_budget, resolve_node_info, HarnessConfig, NodeInfo,
    PluginVariant, Provisioner, ProvisioningContext, ResourceKind,
};
use ostf_testing::{
    cluster_with, node_group, stderr, stdout, FakeCompute, ScriptedOrchestrator, ScriptedShell,
    FAKE_PRIVATE_KEY,
};
use tokio::time::Instant;

const PORT_WAIT: Duration = Duration::from_secs(600);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ostf_cluster=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn node_info(trackers: u32, datanodes: u32) -> NodeInfo {
    NodeInfo {
        namenode_ip: "10.0.0.2".to_string(),
        tasktracker_count: trackers,
        datanode_count: datanodes,
        node_count: trackers.max(datanodes) + 1,
    }
}

fn sahara_image() -> FakeCompute {
    FakeCompute::new().with_image(
        "img-1",
        "savanna",
        &[
            ("_sahara_tag_1.2.1", "True"),
            ("_sahara_tag_vanilla", "True"),
            ("_sahara_username", "ubuntu"),
        ],
    )
}

#[tokio::test(start_paused = true)]
async fn test_resolve_probes_ssh_before_role_ports() {
    let orchestrator = ScriptedOrchestrator::new();
    orchestrator.script(
        "c1",
        [cluster_with(
            "c1",
            "Active",
            vec![
                node_group(&["namenode", "jobtracker"], &["10.0.0.2"]),
                node_group(&["tasktracker", "datanode"], &["10.0.0.3", "10.0.0.4"]),
                node_group(&["oozie"], &["10.0.0.5"]),
            ],
        )],
    );
    let shell = ScriptedShell::new();
    shell.on("/dev/tcp/", [stdout("0\n")]);

    let topology = resolve_node_info(
        &orchestrator,
        &shell,
        "c1",
        &PluginVariant::vanilla(),
        PORT_WAIT,
    )
    .await
    .unwrap();

    assert_eq!(
        topology.node_info,
        NodeInfo {
            namenode_ip: "10.0.0.2".to_string(),
            tasktracker_count: 2,
            datanode_count: 2,
            node_count: 4,
        }
    );

    let probed: Vec<String> = shell
        .commands()
        .iter()
        .filter_map(|c| c.split("/dev/tcp/").nth(1))
        .map(|rest| rest.split('\'').next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        probed,
        vec![
            "10.0.0.2/22",
            "10.0.0.2/50070",
            "10.0.0.2/50030",
            "10.0.0.3/22",
            "10.0.0.3/50060",
            "10.0.0.3/50075",
            "10.0.0.4/22",
            "10.0.0.4/50060",
            "10.0.0.4/50075",
            "10.0.0.5/22",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_resolve_without_namenode_probes_nothing() {
    let orchestrator = ScriptedOrchestrator::new();
    orchestrator.script(
        "c1",
        [cluster_with(
            "c1",
            "Active",
            vec![node_group(&["TASKTRACKER", "DATANODE"], &["10.0.0.3"])],
        )],
    );
    let shell = ScriptedShell::new();

    let err = resolve_node_info(&orchestrator, &shell, "c1", &PluginVariant::hdp(), PORT_WAIT)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClusterError::Topology(TopologyError::NoNamenode { .. })
    ));
    assert!(shell.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_workers_converge_and_key_is_removed() {
    init_tracing();
    let shell = ScriptedShell::new();
    shell
        .accepts_keys()
        .on("-list-active-trackers", [stdout("1\n"), stdout("2\n"), stdout("3\n")])
        .on("dfsadmin -report", [stdout("3\n")]);

    let start = Instant::now();
    await_workers_active(
        &shell,
        &node_info(3, 3),
        &PluginVariant::vanilla(),
        FAKE_PRIVATE_KEY,
        default_worker_budget(),
    )
    .await
    .unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(6));
    assert_eq!(shell.count("-list-active-trackers"), 3);

    let commands = shell.commands();
    let install = &commands[0];
    assert!(install.starts_with("umask 077 && cat > /tmp/ostf-sahara-"));
    assert!(install.contains(FAKE_PRIVATE_KEY));
    assert!(install.contains("chmod 600"));
    assert!(install.ends_with("echo OSTF_KEY_OK"));

    let key_path = install
        .split_whitespace()
        .nth(5)
        .expect("key path in install command")
        .to_string();
    assert!(commands[1].contains(&format!("ssh -i {key_path} -l ubuntu")));
    assert_eq!(commands.last().unwrap(), &format!("rm -f {key_path}"));
}

#[tokio::test(start_paused = true)]
async fn test_off_by_one_worker_count_never_converges() {
    let shell = ScriptedShell::new();
    shell
        .accepts_keys()
        .on("-list-active-trackers", [stdout("2\n")])
        .on("dfsadmin -report", [stdout("3\n")]);

    let start = Instant::now();
    let err = await_workers_active(
        &shell,
        &node_info(3, 3),
        &PluginVariant::vanilla(),
        FAKE_PRIVATE_KEY,
        default_worker_budget(),
    )
    .await
    .unwrap_err();

    assert_eq!(start.elapsed(), Duration::from_secs(297));
    assert_eq!(shell.count("-list-active-trackers"), 100);
    assert_eq!(shell.count("rm -f /tmp/ostf-sahara-"), 1);
    match err {
        ClusterError::WorkerConvergenceTimeout {
            expected_trackers,
            active_trackers,
            attempts,
            ..
        } => {
            assert_eq!(expected_trackers, 3);
            assert_eq!(active_trackers, Some(2));
            assert_eq!(attempts, 100);
        }
        other => panic!("expected WorkerConvergenceTimeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_unparsable_report_counts_as_not_converged() {
    let shell = ScriptedShell::new();
    shell
        .accepts_keys()
        .on("-list-active-trackers", [stdout("1\n")])
        .on("dfsadmin -report", [stdout(""), stdout("1\n")]);

    await_workers_active(
        &shell,
        &node_info(1, 1),
        &PluginVariant::vanilla(),
        FAKE_PRIVATE_KEY,
        default_worker_budget(),
    )
    .await
    .unwrap();

    assert_eq!(shell.count("dfsadmin -report"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_key_install_stops_before_worker_queries() {
    let shell = ScriptedShell::new();
    shell
        .on("umask 077", [stderr("bash: /tmp/ostf-sahara-x.pem: Permission denied\n")])
        .on("-list-active-trackers", [stdout("3\n")])
        .on("dfsadmin -report", [stdout("3\n")]);

    let start = Instant::now();
    let err = await_workers_active(
        &shell,
        &node_info(3, 3),
        &PluginVariant::vanilla(),
        FAKE_PRIVATE_KEY,
        default_worker_budget(),
    )
    .await
    .unwrap_err();

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(shell.count("-list-active-trackers"), 0);
    assert_eq!(shell.count("dfsadmin -report"), 0);
    assert_eq!(shell.count("rm -f /tmp/ostf-sahara-"), 1);
    match err {
        ClusterError::KeyInstall { path, stderr } => {
            assert!(path.starts_with("/tmp/ostf-sahara-"));
            assert!(stderr.ends_with("Permission denied"));
        }
        other => panic!("expected KeyInstall, got {other:?}"),
    }
}

#[tokio::test]
async fn test_network_mode_detection() {
    let compute = FakeCompute::new()
        .with_network("net04_ext", "ext-id")
        .with_pool("nova");
    let config = HarnessConfig::default();

    let neutron = ScriptedShell::new();
    neutron.on(
        "neutronv2",
        [stdout("network_api_class=nova.network.neutronv2.api.API\n")],
    );
    assert_eq!(
        detect_network_mode(&neutron, &compute, &config).await.unwrap(),
        NetworkMode::Neutron {
            floating_network_id: "ext-id".to_string()
        }
    );

    let auto = ScriptedShell::new();
    auto.on("auto_assign_floating_ip", [stdout("auto_assign_floating_ip=True\n")]);
    assert_eq!(
        detect_network_mode(&auto, &compute, &config).await.unwrap(),
        NetworkMode::NovaAutoAssign
    );

    let pools = ScriptedShell::new();
    let mode = detect_network_mode(&pools, &compute, &config).await.unwrap();
    assert_eq!(mode.floating_ip_pool().as_deref(), Some("nova"));
}

#[tokio::test]
async fn test_image_registration_check() {
    let orchestrator = ScriptedOrchestrator::new();
    let shell = ScriptedShell::new();

    let tagged = sahara_image();
    let provisioner = Provisioner::new(&orchestrator, &tagged, &shell, HarnessConfig::default());
    assert!(provisioner.image_is_registered().await.unwrap());

    let untagged = FakeCompute::new().with_image("img-1", "savanna", &[("_sahara_tag_1.2.1", "True")]);
    let provisioner =
        Provisioner::new(&orchestrator, &untagged, &shell, HarnessConfig::default());
    assert!(!provisioner.image_is_registered().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_create_sahara_cluster_end_to_end_and_teardown() {
    init_tracing();
    let orchestrator = ScriptedOrchestrator::new();
    let compute = sahara_image()
        .with_network("net04_ext", "ext-id")
        .with_network("net04", "mgmt-id");
    let shell = ScriptedShell::new();
    shell
        .accepts_keys()
        .on(
            "neutronv2",
            [stdout("network_api_class=nova.network.neutronv2.api.API\n")],
        )
        .on("/dev/tcp/", [stdout("0\n")])
        .on("-list-active-trackers", [stdout("0\n"), stdout("1\n")])
        .on("dfsadmin -report", [stdout("1\n")]);

    let active = cluster_with(
        "cluster-3",
        "Active",
        vec![
            node_group(&["namenode", "jobtracker"], &["10.0.0.2"]),
            node_group(&["tasktracker", "datanode"], &["10.0.0.3"]),
        ],
    );
    orchestrator.script(
        "cluster-3",
        [
            cluster_with("cluster-3", "Spawning", vec![]),
            active.clone(),
        ],
    );

    let provisioner = Provisioner::new(&orchestrator, &compute, &shell, HarnessConfig::default());
    let mut ctx = ProvisioningContext::new();

    let template_id = provisioner.create_tiny_cluster_template(&mut ctx).await.unwrap();
    assert_eq!(template_id, "ct-2");

    let info = provisioner
        .create_sahara_cluster(&mut ctx, &template_id)
        .await
        .unwrap();

    assert_eq!(info.cluster_id, "cluster-3");
    assert_eq!(info.node_info.namenode_ip, "10.0.0.2");
    assert_eq!(info.node_info.tasktracker_count, 1);
    assert_eq!(info.node_info.datanode_count, 1);
    assert_eq!(info.node_ips.len(), 2);

    let ngt = &orchestrator.created_node_group_templates()[0];
    assert_eq!(ngt.floating_ip_pool.as_deref(), Some("ext-id"));
    assert_eq!(ngt.flavor_id, "flavor-1");

    let request = &orchestrator.created_clusters()[0];
    assert_eq!(request.net_id.as_deref(), Some("mgmt-id"));
    assert_eq!(request.default_image_id, "img-1");
    assert_eq!(request.cluster_template_id, "ct-2");
    assert!(request.user_keypair_id.starts_with("ostf_test-savanna-"));
    assert_eq!(compute.flavors().len(), 1);

    let failures = ctx.teardown(&orchestrator, &compute).await;
    assert!(failures.is_empty());
    assert!(ctx.is_empty());
    assert_eq!(
        orchestrator.deleted(),
        vec![
            (ResourceKind::Cluster, "cluster-3".to_string()),
            (ResourceKind::ClusterTemplate, "ct-2".to_string()),
            (ResourceKind::NodeGroupTemplate, "ngt-1".to_string()),
        ]
    );
    assert_eq!(compute.deleted_flavors(), vec!["flavor-1".to_string()]);
    assert_eq!(compute.deleted_keypairs(), compute.keypairs());
}

#[tokio::test(start_paused = true)]
async fn test_failed_cluster_is_still_recorded_for_teardown() {
    let orchestrator = ScriptedOrchestrator::new();
    orchestrator.script("cluster-1", [cluster_with("cluster-1", "Error", vec![])]);
    let compute = sahara_image();
    let shell = ScriptedShell::new();

    let provisioner = Provisioner::new(&orchestrator, &compute, &shell, HarnessConfig::default());
    let mut ctx = ProvisioningContext::new();

    let err = provisioner
        .create_cluster_and_get_info(&mut ctx, "ct-x", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterError::ClusterFailed { .. }));
    assert_eq!(ctx.clusters(), ["cluster-1".to_string()]);
    assert_eq!(ctx.keypairs().len(), 1);

    orchestrator.fail_delete("cluster-1");
    let failures = ctx.teardown(&orchestrator, &compute).await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].id, "cluster-1");
    assert_eq!(ctx.clusters(), ["cluster-1".to_string()]);
    assert!(ctx.keypairs().is_empty());
}

#[tokio::test]
async fn test_unknown_plugin_is_rejected_before_creating_anything() {
    let orchestrator = ScriptedOrchestrator::new();
    let compute = sahara_image();
    let shell = ScriptedShell::new();
    let config = HarnessConfig {
        plugin_name: "spark".to_string(),
        ..HarnessConfig::default()
    };

    let provisioner = Provisioner::new(&orchestrator, &compute, &shell, config);
    let mut ctx = ProvisioningContext::new();
    let err = provisioner
        .create_cluster_and_get_info(&mut ctx, "ct-x", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ClusterError::UnknownVariant(ref p) if p == "spark"));
    assert!(ctx.is_empty());
    assert!(compute.keypairs().is_empty());
}
