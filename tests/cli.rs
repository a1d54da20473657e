//! Runs the `smallfor` binary and checks what it prints.

use std::process::Command;

fn run(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_smallfor"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    assert!(output.status.success(), "exit status {:?}", output.status);
    String::from_utf8(output.stdout).unwrap()
}

fn assert_banners(stdout: &str) {
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(
        lines.first().is_some_and(|l| l.ends_with("## Starting parallel_for...")),
        "{stdout}"
    );
    assert!(
        lines.last().is_some_and(|l| l.ends_with("## Finished parallel_for")),
        "{stdout}"
    );
}

/// Digit lines, sorted. Header and banner lines all contain `##`.
fn digit_lines(stdout: &str) -> Vec<String> {
    let mut lines: Vec<String> = stdout
        .lines()
        .filter(|l| !l.contains("##"))
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}

fn expected_digit_lines(n: usize) -> Vec<String> {
    let mut lines: Vec<String> = (0..n)
        .map(|i| (0..i).map(|d| format!("{d} ")).collect())
        .collect();
    lines.sort();
    lines
}

#[test]
fn default_run_prints_every_task() {
    let stdout = run(&[]);
    assert_banners(&stdout);
    assert_eq!(stdout.matches("## : ").count(), 10);

    // Workers share stdout, so digits from different tasks may end up on the
    // same line. Counting digits is unaffected by that: `d` appears once in
    // each task with a limit above `d`.
    let mut counts = [0usize; 9];
    for token in stdout.split_whitespace() {
        if let Ok(d) = token.parse::<usize>() {
            counts[d] += 1;
        }
    }
    let expected: Vec<usize> = (0..9).map(|d| 9 - d).collect();
    assert_eq!(counts.to_vec(), expected);
}

#[test]
fn single_worker_prints_each_digit_line() {
    let stdout = run(&["--threads", "1"]);
    assert_banners(&stdout);
    assert_eq!(digit_lines(&stdout), expected_digit_lines(10));
}

#[test]
fn serial_run_prints_each_digit_line() {
    let stdout = run(&["--serial"]);
    assert_banners(&stdout);
    assert_eq!(digit_lines(&stdout), expected_digit_lines(10));
}

#[test]
fn task_count_and_partitioner_flags() {
    let stdout = run(&["--tasks", "4", "--partitioner", "static", "--threads", "1"]);
    assert_banners(&stdout);
    assert_eq!(digit_lines(&stdout), expected_digit_lines(4));

    let stdout = run(&["--tasks", "0"]);
    assert_banners(&stdout);
    assert!(digit_lines(&stdout).is_empty());
}
