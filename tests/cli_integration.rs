use std::process::Command;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_dsvcodec").to_string()
}

#[test]
fn cli_parse_prints_json_lines() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.csv");
    std::fs::write(&input, "a,\"b,c\"\r\n\"x\"\"y\",\r\n").unwrap();

    let out = Command::new(bin()).arg("parse").arg(&input).output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let rows: Vec<Vec<String>> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(
        rows,
        vec![vec!["a", "b,c"], vec!["x\"y", ""]]
            .into_iter()
            .map(|r| r.into_iter().map(String::from).collect::<Vec<_>>())
            .collect::<Vec<_>>()
    );
}

#[test]
fn cli_parse_to_file_respects_force() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.tsv");
    let output = dir.path().join("rows.jsonl");
    std::fs::write(&input, "a\tb\n").unwrap();
    std::fs::write(&output, "existing").unwrap();

    let st = Command::new(bin())
        .args(["parse", "--dialect", "tsv"])
        .arg(&input)
        .arg(&output)
        .status()
        .unwrap();
    assert!(!st.success());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "existing");

    let st = Command::new(bin())
        .args(["--force", "parse", "--dialect", "tsv"])
        .arg(&input)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "[\"a\",\"b\"]\n");
}

#[test]
fn cli_convert_csv_to_tsv() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.tsv");
    std::fs::write(&input, "name,note\nx,\"has\ttab\"\ny\n").unwrap();

    let st = Command::new(bin())
        .args(["convert", "--to-dialect", "tsv", "--line-ending", "crlf"])
        .arg(&input)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "name\tnote\r\nx\t\"has\ttab\"\r\ny\t\r\n"
    );
}

#[test]
fn cli_convert_custom_delimiters() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    std::fs::write(&input, "a##b##c\n").unwrap();

    let st = Command::new(bin())
        .args([
            "convert",
            "--delimiter",
            "##",
            "--to-delimiter",
            ";",
            "--always-quote",
            "--line-ending",
            "lf",
        ])
        .arg(&input)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "\"a\";\"b\";\"c\"\n"
    );
}

#[test]
fn cli_convert_null_string_marks_empty_fields() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.csv");
    std::fs::write(&input, "a,,b\n,\n").unwrap();

    let convert = |name: &str, extra: &[&str]| {
        let output = dir.path().join(name);
        let st = Command::new(bin())
            .args(["convert", "--line-ending", "lf"])
            .args(extra)
            .arg(&input)
            .arg(&output)
            .status()
            .unwrap();
        assert!(st.success());
        std::fs::read_to_string(&output).unwrap()
    };

    assert_eq!(convert("plain.csv", &[]), "a,,b\n,,\n");
    assert_eq!(
        convert("nulls.csv", &["--null-string", "NULL"]),
        "a,NULL,b\nNULL,NULL,\n"
    );
    assert_eq!(
        convert("marker.csv", &["--input-null", "a", "--null-string", "?"]),
        "?,,b\n,,\n"
    );
}

#[test]
fn cli_convert_shift_jis_to_utf8() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sjis.csv");
    let output = dir.path().join("utf8.csv");
    // "あ,い\n" in Shift_JIS
    std::fs::write(&input, [0x82, 0xa0, b',', 0x82, 0xa2, b'\n']).unwrap();

    let st = Command::new(bin())
        .args(["convert", "--encoding", "shift_jis", "--to-encoding", "utf-8"])
        .args(["--line-ending", "lf"])
        .arg(&input)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "あ,い\n");

    let back = dir.path().join("back.csv");
    let st = Command::new(bin())
        .args(["convert", "--to-encoding", "ms932", "--line-ending", "lf"])
        .arg(&output)
        .arg(&back)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(std::fs::read(&back).unwrap(), std::fs::read(&input).unwrap());

    let out = Command::new(bin())
        .args(["stats", "--json", "--encoding", "sjis"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["rows"], 1);
    assert_eq!(json["fields"], 2);
    assert_eq!(json["encoding"], "Shift_JIS");
}

#[test]
fn cli_stats_json() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.csv");
    std::fs::write(&input, "a,b,c\nd\n").unwrap();

    let out = Command::new(bin())
        .args(["stats", "--json"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["rows"], 2);
    assert_eq!(json["fields"], 4);
    assert_eq!(json["max_width"], 3);
    assert_eq!(json["bytes"], 8);
    assert_eq!(json["compression"], "none");
}

#[test]
fn cli_reports_errors_with_prefix() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.csv");
    let out = Command::new(bin()).arg("stats").arg(&missing).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.starts_with("dsvcodec: "), "stderr: {stderr}");

    let input = dir.path().join("in.csv");
    std::fs::write(&input, "a\n").unwrap();
    let out = Command::new(bin())
        .args(["parse", "--delimiter", "\""])
        .arg(&input)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8(out.stderr).unwrap().contains("input options"));
}

#[test]
fn cli_config_works() {
    let out = Command::new(bin()).arg("config").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("DIALECTS=csv,tsv"));
    assert!(stdout.contains("DEFAULT_ENCODING=UTF-8"));
}
