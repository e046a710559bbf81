use super::*;
use crate::test_utils;
use tempfile::TempDir;

fn sample_results(tmp: &TempDir) -> ResultList {
    test_utils::write_png(&tmp.path().join("a.png"), 100, 50);
    std::fs::write(tmp.path().join("b.txt"), b"plain").unwrap();
    let dir = tmp.path().join("folder");
    std::fs::create_dir(&dir).unwrap();

    ResultList::new(vec![
        FileDescriptor::directory(&dir),
        FileDescriptor::from_file(&tmp.path().join("a.png")),
        FileDescriptor::from_file(&tmp.path().join("b.txt")),
    ])
}

#[test]
fn test_json_rows_by_format_class() {
    let tmp = TempDir::new().unwrap();
    let results = sample_results(&tmp);

    let json: serde_json::Value = serde_json::from_str(&results.to_json(false)).unwrap();
    assert_eq!(json["count"], 3);

    let rows = json["files"].as_array().unwrap();
    assert_eq!(rows[0]["format"], "<dir>");
    assert!(rows[0].get("size").is_none());
    assert!(rows[0].get("width").is_none());

    assert_eq!(rows[1]["format"], "png");
    assert_eq!(rows[1]["width"], 100);
    assert_eq!(rows[1]["height"], 50);

    assert_eq!(rows[2]["format"], "unknown");
    assert!(rows[2].get("width").is_none());
    assert!(rows[2]["size"].as_u64().unwrap() > 0);

    // Dates render as `YYYY-MM-DD HH:MM:SS` next to the raw timestamp.
    let date = rows[1]["date"].as_str().unwrap();
    assert_eq!(date.len(), 19);
    assert_eq!(&date[4..5], "-");
    assert!(rows[1]["dateTs"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_csv_rows_keep_undefined_cells_empty() {
    let tmp = TempDir::new().unwrap();
    let results = sample_results(&tmp);

    let csv = results.to_csv('\t', true);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("Path\tFile name"));

    let dir_cells: Vec<&str> = lines[1].split('\t').collect();
    assert_eq!(dir_cells[1], "folder");
    assert_eq!(dir_cells[2], "");
    assert_eq!(dir_cells[4], "<dir>");

    let png_cells: Vec<&str> = lines[2].split('\t').collect();
    assert_eq!(png_cells[1], "a.png");
    assert_eq!(png_cells[4], "png");
    assert_eq!(png_cells[5], "100");
    assert_eq!(png_cells[6], "50");

    let txt_cells: Vec<&str> = lines[3].split('\t').collect();
    assert_eq!(txt_cells[1], "b.txt");
    assert_eq!(txt_cells[4], "");
    assert_eq!(txt_cells[5], "");
}

#[test]
fn test_clear_drops_descriptors() {
    let tmp = TempDir::new().unwrap();
    let mut results = sample_results(&tmp);
    assert_eq!(results.len(), 3);
    results.clear();
    assert!(results.is_empty());
}
