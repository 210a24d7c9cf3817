//! DirOutputSink writes the three deliverables under their conventional
//! names.

use insight_loom::model::{ExecutiveSummary, Insight, Priority, Sentiment, ThemeCluster};
use insight_loom::report::{write_reports, DirOutputSink, ReportKind};
use uuid::Uuid;

fn fixture() -> (Vec<Insight>, Vec<ThemeCluster>, ExecutiveSummary) {
    let insight = Insight {
        quote: "Exporting took me four tries".to_string(),
        speaker: Some("P6".to_string()),
        theme: "Export".to_string(),
        sentiment: Sentiment::Negative,
        confidence: 0.9,
        context: "task 4".to_string(),
        timestamp: None,
    };
    let theme = ThemeCluster {
        theme_name: "Export Friction".to_string(),
        insights: vec![insight.clone()],
        frequency: 1,
        priority: Priority::Low,
        summary: "Export flow demands retries".to_string(),
    };
    let summary = ExecutiveSummary {
        research_question: "Is exporting usable?".to_string(),
        key_finding: "Export needs retries".to_string(),
        key_insight: "Errors are silent".to_string(),
        recommendation: "Surface export errors inline".to_string(),
        context: None,
    };
    (vec![insight], vec![theme], summary)
}

#[tokio::test]
async fn dir_sink_writes_all_three_files() {
    let dir = tempfile::tempdir().unwrap();
    let sink = DirOutputSink::new(dir.path());
    let (insights, themes, summary) = fixture();

    let outputs = write_reports(&sink, Uuid::new_v4(), &insights, &themes, &[], &summary)
        .await
        .unwrap();

    assert_eq!(outputs.len(), 3);
    let json_path = dir.path().join("research_synthesis.json");
    let exec_path = dir.path().join("executive_summary.md");
    let detail_path = dir.path().join("detailed_insights.md");
    assert!(json_path.is_file());
    assert!(exec_path.is_file());
    assert!(detail_path.is_file());

    // Locators point at the files that were written.
    assert_eq!(
        outputs.get(&ReportKind::JsonReport).unwrap(),
        &json_path.display().to_string()
    );

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["summary"]["total_insights"], 1);
    assert_eq!(json["summary"]["key_insights_count"], 0);

    let detail = std::fs::read_to_string(&detail_path).unwrap();
    assert!(detail.contains("### Export Friction (1 insights)"));
    assert!(detail.contains("\"Exporting took me four tries\""));
}

#[tokio::test]
async fn dir_sink_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("runs").join("latest");
    let sink = DirOutputSink::new(&nested);
    let (insights, themes, summary) = fixture();

    write_reports(&sink, Uuid::new_v4(), &insights, &themes, &[], &summary)
        .await
        .unwrap();

    assert!(nested.join("executive_summary.md").is_file());
}
