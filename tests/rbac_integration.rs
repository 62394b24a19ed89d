//! Integration tests for the RBAC engine with real-world scenarios
//!
//! These tests verify end-to-end functionality including:
//! - The newsroom example: load, check, mutate, persist
//! - Round trips through serde formats
//! - Concurrent queries while the graph is being mutated
//! - The rbac-persist binary

#[cfg(test)]
mod integration_tests {
    use rbac::records::{self, GraphRecords};
    use rbac::{walk, Condition, Permission, PermissionRegistry, RbacError, Role, RoleGraph};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::task::JoinSet;

    const ROLES_YAML: &str = "\
editor:
  - add-text
chief-editor: []
photographer:
  - add-photos
";

    const INHERITANCE_YAML: &str = "\
chief-editor:
  - editor
";

    fn newsroom() -> (RoleGraph, PermissionRegistry) {
        let roles = serde_yaml::from_str(ROLES_YAML).unwrap();
        let inheritance = serde_yaml::from_str(INHERITANCE_YAML).unwrap();
        let registry = PermissionRegistry::new();
        let graph = records::build(&GraphRecords::new(roles, inheritance), &registry).unwrap();
        (graph, registry)
    }

    #[test]
    fn test_newsroom_end_to_end() {
        let (graph, registry) = newsroom();
        let add_text = registry.get("add-text").unwrap();
        let read_text = Permission::exact("read-text");

        assert!(graph.is_granted("editor", &add_text, None));
        assert!(graph.is_granted("chief-editor", &add_text, None));
        assert!(!graph.is_granted("photographer", &add_text, None));
        assert!(!graph.is_granted("nobody", &read_text, None));

        let read_text = registry.ensure_default("read-text");
        graph
            .add(Role::new("nobody").with_permissions([read_text.clone()]))
            .unwrap();
        assert!(graph.is_granted("nobody", &read_text, None));

        let output = records::dump(&graph);
        let mut expected_roles = BTreeMap::new();
        expected_roles.insert("chief-editor".to_string(), vec![]);
        expected_roles.insert("editor".to_string(), vec!["add-text".to_string()]);
        expected_roles.insert("nobody".to_string(), vec!["read-text".to_string()]);
        expected_roles.insert("photographer".to_string(), vec!["add-photos".to_string()]);
        assert_eq!(output.roles, expected_roles);
        assert_eq!(output.inheritance["chief-editor"], vec!["editor"]);
        assert!(output.inheritance["nobody"].is_empty());
    }

    #[test]
    fn test_yaml_roundtrip_answers_identically() {
        let (graph, registry) = newsroom();
        let dumped = records::dump(&graph);

        let roles_yaml = serde_yaml::to_string(&dumped.roles).unwrap();
        let inheritance_yaml = serde_yaml::to_string(&dumped.inheritance).unwrap();

        let reloaded = GraphRecords::new(
            serde_yaml::from_str(&roles_yaml).unwrap(),
            serde_yaml::from_str(&inheritance_yaml).unwrap(),
        );
        let rebuilt = records::build(&reloaded, &registry).unwrap();

        for role in ["editor", "chief-editor", "photographer", "nobody"] {
            for permission in ["add-text", "add-photos", "read-text"] {
                let permission = Permission::exact(permission);
                assert_eq!(
                    graph.is_granted(role, &permission, None),
                    rebuilt.is_granted(role, &permission, None),
                    "{} / {}",
                    role,
                    permission
                );
            }
        }
        assert_eq!(records::dump(&rebuilt), dumped);
    }

    #[test]
    fn test_json_roundtrip_of_records() {
        let (graph, _) = newsroom();
        let dumped = records::dump(&graph);

        let json = serde_json::to_string(&dumped).unwrap();
        let decoded: GraphRecords = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, dumped);
    }

    #[test]
    fn test_rejected_cycle_leaves_graph_untouched() {
        let (graph, _) = newsroom();
        let before = records::dump(&graph);

        let result = graph.set_parents("editor", ["chief-editor"]);
        assert!(matches!(result, Err(RbacError::CycleDetected { .. })));

        assert_eq!(records::dump(&graph), before);
    }

    #[test]
    fn test_walk_handler_errors_propagate() {
        let (graph, _) = newsroom();
        let mut exported = Vec::new();

        let result = walk(&graph, |role, _| {
            if role.id() == "photographer" {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            exported.push(role.id().to_string());
            Ok(())
        });

        assert_eq!(result.unwrap_err().to_string(), "disk full");
        assert!(!exported.contains(&"photographer".to_string()));
    }

    #[test]
    fn test_condition_gates_by_role_attribute() {
        let (graph, _) = newsroom();
        let suspended = ["editor"];
        let active: &Condition = &|role, _| !suspended.contains(&role.id());

        let add_text = Permission::exact("add-text");
        assert!(!graph.is_granted("chief-editor", &add_text, Some(active)));
        assert!(graph.is_granted("chief-editor", &add_text, None));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_queries_during_add() {
        let (graph, _) = newsroom();
        let graph = Arc::new(graph);
        let done = Arc::new(AtomicBool::new(false));

        let newcomer_permissions: Vec<Permission> = (0..50)
            .map(|i| Permission::exact(format!("task-{}", i)))
            .collect();

        let mut set = JoinSet::new();
        for _ in 0..8 {
            let graph = Arc::clone(&graph);
            let done = Arc::clone(&done);
            let permissions = newcomer_permissions.clone();
            set.spawn_blocking(move || {
                let add_text = Permission::exact("add-text");
                let mut checks = 0usize;
                loop {
                    let finished = done.load(Ordering::Acquire);

                    assert!(graph.is_granted("chief-editor", &add_text, None));
                    if let Some(role) = graph.get("newcomer") {
                        assert_eq!(role.permission_count(), permissions.len());
                        assert!(permissions
                            .iter()
                            .all(|p| graph.is_granted("newcomer", p, None)));
                    }
                    checks += 1;

                    if finished {
                        break;
                    }
                }
                checks
            });
        }

        let writer = Arc::clone(&graph);
        let role = Role::new("newcomer").with_permissions(newcomer_permissions.clone());
        tokio::task::spawn_blocking(move || writer.add(role))
            .await
            .unwrap()
            .unwrap();
        done.store(true, Ordering::Release);

        let mut total = 0;
        while let Some(result) = set.join_next().await {
            total += result.unwrap();
        }
        assert!(total >= 8);
        assert!(graph.is_granted("newcomer", &newcomer_permissions[0], None));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_stay_acyclic() {
        let graph = Arc::new(RoleGraph::new());
        for i in 0..20 {
            graph.add(Role::new(format!("role_{}", i))).unwrap();
        }

        let mut set = JoinSet::new();
        for worker in 0..4usize {
            let graph = Arc::clone(&graph);
            set.spawn_blocking(move || {
                for step in 0..200usize {
                    let child = format!("role_{}", (worker * 7 + step * 3) % 20);
                    let parent = format!("role_{}", (worker * 11 + step * 5 + 1) % 20);
                    let _ = graph.add_parent(&child, &parent);
                }
            });
        }

        while let Some(result) = set.join_next().await {
            result.unwrap();
        }

        assert!(graph.detect_cycles().is_ok());
    }

    #[test]
    fn test_persist_binary_writes_records() {
        let dir = std::env::temp_dir().join(format!("rbac-persist-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let roles_out = dir.join("new-roles.yaml");
        let inheritance_out = dir.join("new-inher.json");

        let status = std::process::Command::new(env!("CARGO_BIN_EXE_rbac-persist"))
            .env("RBAC_ROLES_FILE", concat!(env!("CARGO_MANIFEST_DIR"), "/demos/roles.yaml"))
            .env("RBAC_INHERITANCE_FILE", concat!(env!("CARGO_MANIFEST_DIR"), "/demos/inher.yaml"))
            .env("RBAC_OUTPUT_ROLES_FILE", &roles_out)
            .env("RBAC_OUTPUT_INHERITANCE_FILE", &inheritance_out)
            .env("RUST_LOG", "warn")
            .status()
            .unwrap();
        assert!(status.success());

        let roles: BTreeMap<String, Vec<String>> =
            serde_yaml::from_str(&std::fs::read_to_string(&roles_out).unwrap()).unwrap();
        let inheritance: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&std::fs::read_to_string(&inheritance_out).unwrap()).unwrap();

        assert_eq!(roles["nobody"], vec!["read-text"]);
        assert_eq!(roles["editor"], vec!["add-text", "edit-text", "insert-photo"]);
        assert_eq!(inheritance["chief-editor"], vec!["editor", "photographer"]);
        assert!(inheritance["photographer"].is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
