use grit::{GritEngine, LocalStorage, OutputPipeline, Project, ProjectSource};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn demo_project() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/simple")
}

fn read_json(path: PathBuf) -> anyhow::Result<Value> {
    Ok(serde_json::from_slice(&std::fs::read(path)?)?)
}

async fn generate(out: &Path, variation: &str, bundle: bool) -> anyhow::Result<String> {
    let project = Project::open(demo_project())?;
    let variation = project.variation(variation)?;
    let root = out.display().to_string();
    let pipeline = OutputPipeline::new(
        ProjectSource::new(project, variation),
        LocalStorage::new(root.clone()),
        root,
    )
    .with_bundle(bundle);
    Ok(GritEngine::new(pipeline).run().await?)
}

#[test]
fn test_inspect_demo_project() -> anyhow::Result<()> {
    let project = Project::open(demo_project())?;
    let info = serde_json::to_value(project.inspect())?;

    assert_eq!(info["name"], "simple");
    assert_eq!(info["folders"], serde_json::json!(["platform", "services"]));
    assert_eq!(info["variations"], serde_json::json!(["prod", "stage"]));
    Ok(())
}

#[tokio::test]
async fn test_generate_demo_dashboard() -> anyhow::Result<()> {
    let out = TempDir::new()?;
    let summary = generate(out.path(), "prod", false).await?;
    assert_eq!(summary, format!("{}/prod", out.path().display()));

    let dashboard = read_json(out.path().join("prod/services/api-prod.json"))?;
    assert_eq!(dashboard["uid"], "api-prod");
    assert_eq!(dashboard["tags"], serde_json::json!(["api", "prod"]));
    assert_eq!(dashboard["refresh"], "1m");

    let panels = dashboard["panels"].as_array().unwrap();
    let titles: Vec<&str> = panels.iter().map(|p| p["title"].as_str().unwrap()).collect();
    assert_eq!(
        titles,
        vec!["Traffic", "Requests", "Errors", "Latency p99", "Notes"]
    );
    assert_eq!(panels[0]["type"], "row");
    assert_eq!(panels[1]["gridPos"], serde_json::json!({"h": 8, "w": 12, "x": 0, "y": 1}));
    assert_eq!(panels[2]["gridPos"], serde_json::json!({"h": 8, "w": 12, "x": 12, "y": 1}));
    assert_eq!(panels[3]["gridPos"], serde_json::json!({"h": 6, "w": 12, "x": 0, "y": 9}));
    assert_eq!(panels[4]["options"]["mode"], "markdown");

    let expr = panels[1]["targets"][0]["expr"].as_str().unwrap();
    assert!(expr.contains("cluster=\"eu-prod\""));

    let template = &dashboard["templating"]["list"][0];
    assert_eq!(template["name"], "instance");
    Ok(())
}

#[tokio::test]
async fn test_generate_demo_alerts() -> anyhow::Result<()> {
    let out = TempDir::new()?;
    generate(out.path(), "stage", false).await?;

    let derived = read_json(out.path().join("stage-alerts/api-stage.json"))?;
    assert_eq!(derived["apiVersion"], 1);
    let group = &derived["groups"][0];
    assert_eq!(group["name"], "API");
    assert_eq!(group["folder"], "Services (stage)");
    let rule = &group["rules"][0];
    assert_eq!(rule["title"], "[STAGE] Errors | api");
    assert_eq!(rule["condition"], "ALERT_CONDITION");
    assert_eq!(rule["dashboardUid"], "api-stage");
    assert_eq!(rule["panelId"], 3);
    assert_eq!(rule["labels"]["severity"], "critical");
    assert_eq!(rule["labels"]["service"], "api");

    let explicit = read_json(out.path().join("stage-alerts/heartbeat.json"))?;
    let group = &explicit["groups"][0];
    assert_eq!(group["name"], "Heartbeat");
    assert_eq!(group["folder"], "platform");
    assert_eq!(group["interval"], "30s");
    let rule = &group["rules"][0];
    assert_eq!(rule["title"], "Prometheus scrape missing (stage)");
    assert_eq!(rule["for"], "2m");
    assert_eq!(rule["data"].as_array().unwrap().len(), 3);
    assert_eq!(rule["data"][0]["datasourceUid"], "prometheus-stage");

    let manifest = read_json(out.path().join("stage/manifest.json"))?;
    assert_eq!(manifest["ruleCount"], 2);
    assert_eq!(manifest["provider"], "onprem");
    Ok(())
}

#[tokio::test]
async fn test_generate_bundle() -> anyhow::Result<()> {
    let out = TempDir::new()?;
    generate(out.path(), "prod", true).await?;

    let file = std::fs::File::open(out.path().join("prod.zip"))?;
    let archive = zip::ZipArchive::new(file)?;
    assert_eq!(archive.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_unknown_variation() -> anyhow::Result<()> {
    let project = Project::open(demo_project())?;
    let err = project.variation("qa").unwrap_err();
    assert!(matches!(err, grit::GritError::UnknownVariation { .. }));
    Ok(())
}
