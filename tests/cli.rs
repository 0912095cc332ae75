use std::process::Command;

#[test]
fn prints_a_similarity_line_for_two_identical_fixture_files() {
    let dir = std::env::temp_dir().join(format!("simuncover-cli-smoke-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let f1 = dir.join("a.txt");
    let f2 = dir.join("b.txt");
    std::fs::write(&f1, "aaaa\nbbbb\ncccc\n").unwrap();
    std::fs::write(&f2, "aaaa\nbbbb\ncccc\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_simuncover"))
        .arg(&f1)
        .arg(&f2)
        .arg("--print-equal")
        .output()
        .expect("failed to run the simuncover binary");

    std::fs::remove_dir_all(&dir).ok();

    assert!(output.status.success(), "exit status: {:?}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.lines().any(|l| l.starts_with("equal:")),
        "expected at least one equal similarity line, got: {stdout:?}"
    );
}
