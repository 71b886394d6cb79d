use std::{
    fs,
    io::Write,
    path::Path,
    process::{Command, Output, Stdio},
};

const SYMBOLS: &str = ".eps 0\n.wb 1\na_1.0 2\nsi_1.0 3\nb_1.0 4\nb_2.0 5\n";
const STATES_LOG: &str = "\
a_1.0 n=12 -1={si} 0={a} 1={si}
si_1.0 n=40 -1={a b} 0={si} 1={a b}
b_1.0 n=7 -1={a} 0={b} 1={a si}
b_2.0 n=7 -1={a} 0={b} 1={a si}
";

fn setup(dir: &Path, allophones: &str) {
    fs::write(dir.join("states.sym"), SYMBOLS).unwrap();
    fs::write(dir.join("states.log"), STATES_LOG).unwrap();
    fs::write(dir.join("allophones.txt"), allophones).unwrap();
}

fn lookup_table(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lookup-table"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

const ARGS: [&str; 8] = [
    "-s",
    "states.sym",
    "-l",
    "states.log",
    "-a",
    "allophones.txt",
    "-c",
    "si",
];

#[test]
fn test_missing_required_options() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), "");

    let output = lookup_table(dir.path(), &["-s", "states.sym"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_lookup_table() {
    let dir = tempfile::tempdir().unwrap();
    setup(
        dir.path(),
        "# allophone states\n\
         a{si+si}.0\n\
         a{#+#}@i.0\n\
         si{#+#}@i@f.0\n\
         b{a+#}.0\n\
         b{a+si}.1\n\
         b{b+a}.0\n",
    );

    let output = lookup_table(dir.path(), &ARGS);
    assert!(output.status.success());

    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "a{si+si}.0 0\n\
         a{#+#}@i.0 0\n\
         si{#+#}@i@f.0 1\n\
         b{a+#}.0 2\n\
         b{a+si}.1 3\n"
    );

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("[WARNING] not found: a{#+#}@i.0\n"));
    assert!(!stderr.contains("[ERROR] cannot map a{#+#}@i.0"));
    assert!(stderr.contains("[WARNING] not found: b{b+a}.0\n"));
    assert!(stderr.contains("[ERROR] cannot map b{b+a}.0\n"));
}

#[test]
fn test_output_option_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), "a{si+si}.0\n");

    let mut args = ARGS.to_vec();
    args.extend(["-o", "table.txt"]);
    let output = lookup_table(dir.path(), &args);

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "a{si+si}.0 0\n");
    assert!(!dir.path().join("table.txt").exists());
}

#[test]
fn test_reads_standard_input() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), "");

    let mut child = Command::new(env!("CARGO_BIN_EXE_lookup-table"))
        .current_dir(dir.path())
        .args(["-s", "states.sym", "-l", "states.log", "-c", "si"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"b{a+a}.0\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "b{a+a}.0 2\n");
}

#[test]
fn test_malformed_state_log_fails() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), "a{si+si}.0\n");
    fs::write(dir.path().join("states.log"), "a_1.0 -1={si} 1={si} 0={a}\n").unwrap();

    let output = lookup_table(dir.path(), &ARGS);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
