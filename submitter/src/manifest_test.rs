use crate::manifest::{dag_node, DagManifest};
use std::{fs, path::Path};

#[test]
pub fn node_names_are_sanitized() {
    assert_eq!(dag_node("npx4", "job1"), "npx4_job1_dot_sh");
    assert_eq!(
        dag_node("condor00", "e-2.5+x"),
        "condor00_e_minus_2_dot_5_plus_x_dot_sh"
    );
}

#[test]
pub fn spelled_out_labels_keep_distinct_nodes() {
    assert_eq!(dag_node("condor00", "a.b"), "condor00_a_dot_b_dot_sh");
    assert_eq!(dag_node("condor00", "a_dot_b"), "condor00_a__dot__b_dot_sh");
    assert_eq!(dag_node("npx4", "x_plus_-"), "npx4_x__plus___minus__dot_sh");

    let labels = ["a.b", "a_dot_b", "a__dot__b", "a+b", "a_plus_b", "a-b", "a_b", "a__b"];
    let nodes: std::collections::HashSet<_> =
        labels.iter().map(|label| dag_node("npx4", label)).collect();
    assert_eq!(nodes.len(), labels.len());
}

#[test]
pub fn entries_keep_submission_order() {
    let mut manifest = DagManifest::new(Path::new("/jobs"), "condor00", None);
    manifest.push("b", "/jobs/logs/b.sub");
    manifest.push("a", "/jobs/logs/a.sub");

    assert_eq!(
        manifest.to_string(),
        "CONFIG /jobs/condor00_submit.dag.config\nJOB b /jobs/logs/b.sub\nJOB a /jobs/logs/a.sub\n"
    );
    assert!(!manifest.to_string().contains("PARENT"));
}

#[test]
pub fn relative_config_reference() {
    let manifest = DagManifest::new(Path::new("/jobs"), "osg", Some(50)).relative();

    assert_eq!(manifest.to_string(), "CONFIG osg_submit.dag.config\n");
    assert_eq!(manifest.config_path(), Path::new("/jobs/osg_submit.dag.config"));
}

#[test]
pub fn writes_throttle_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut manifest = DagManifest::new(dir.path(), "npx4", Some(50));
    manifest.push("n", "n.sub");
    manifest.write().unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("npx4_submit.dag.config")).unwrap(),
        "DAGMAN_MAX_SUBMITS_PER_INTERVAL = 50\n"
    );
    assert!(fs::read_to_string(manifest.path())
        .unwrap()
        .ends_with("JOB n n.sub\n"));
}

#[test]
pub fn unthrottled_config_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = DagManifest::new(dir.path(), "condor00", None);
    manifest.write().unwrap();

    assert_eq!(fs::read_to_string(manifest.config_path()).unwrap(), "");
    assert!(manifest.is_empty());
}
