use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

const TRIANGLE: [&str; 3] = ["0-1", "1-2", "2-0"];
const K4: [&str; 6] = ["0-1", "0-2", "0-3", "1-2", "1-3", "2-3"];

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_threecolor"))
}

fn namespace(tag: &str) -> String {
    format!("/threecolor_it_{}_{}", std::process::id(), tag)
}

/// Files the named objects show up as under /dev/shm on Linux.
fn shm_files(ns: &str) -> Vec<PathBuf> {
    let base = ns.trim_start_matches('/');
    let dir = PathBuf::from("/dev/shm");
    vec![
        dir.join(format!("{}_shm", base)),
        dir.join(format!("sem.{}_sem_free", base)),
        dir.join(format!("sem.{}_sem_used", base)),
        dir.join(format!("sem.{}_sem_write", base)),
    ]
}

fn wait_for_channel(ns: &str) {
    let ready = shm_files(ns).pop().unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while !ready.exists() {
        assert!(Instant::now() < deadline, "supervisor never created {:?}", ready);
        sleep(Duration::from_millis(10));
    }
}

fn wait_with_timeout(mut child: Child, what: &str) -> Output {
    let deadline = Instant::now() + Duration::from_secs(30);
    loop {
        if child.try_wait().unwrap().is_some() {
            return child.wait_with_output().unwrap();
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("{} did not exit in time", what);
        }
        sleep(Duration::from_millis(20));
    }
}

fn assert_cleaned_up(ns: &str) {
    for file in shm_files(ns) {
        assert!(!file.exists(), "{:?} left behind", file);
    }
}

fn spawn(args: &[&str]) -> Child {
    Command::new(binary())
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute threecolor")
}

/// Conflict counts of the progress lines, in order.
fn improvement_counts(stdout: &str) -> Vec<usize> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("Solution with "))
        .map(|rest| rest.split_whitespace().next().unwrap().parse().unwrap())
        .collect()
}

#[test]
fn test_solve_triangle() {
    let ns = namespace("solve_triangle");
    let mut args = vec!["solve", "-j", "2", "--seed", "1", "--namespace", &ns];
    args.extend(TRIANGLE);

    let output = wait_with_timeout(spawn(&args), "solve");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "solve failed\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout.lines().last(), Some("The graph is 3-colorable!"));
    assert_cleaned_up(&ns);
}

#[test]
fn test_solve_k4_stops_at_limit() {
    let ns = namespace("solve_k4");
    let mut args = vec!["solve", "-j", "2", "--limit", "300", "--namespace", &ns];
    args.extend(K4);

    let output = wait_with_timeout(spawn(&args), "solve");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "solve failed\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // K4 is not 3-colorable: progress only, strictly improving, never solved.
    assert!(!stdout.contains("3-colorable"));
    let counts = improvement_counts(&stdout);
    assert!(!counts.is_empty());
    assert!(counts.windows(2).all(|w| w[1] < w[0]), "{:?}", counts);
    assert!(counts.iter().all(|&c| c >= 1));
    assert_cleaned_up(&ns);
}

#[test]
fn test_separate_supervisor_and_generators() {
    let ns = namespace("separate");
    let supervisor = spawn(&["supervisor", "--namespace", &ns]);
    wait_for_channel(&ns);

    let generators: Vec<Child> = (0..3)
        .map(|i| {
            let seed = i.to_string();
            let mut args = vec!["generator", "--namespace", &ns, "--seed", &seed];
            args.extend(TRIANGLE);
            spawn(&args)
        })
        .collect();

    let output = wait_with_timeout(supervisor, "supervisor");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().last(), Some("The graph is 3-colorable!"));

    // Every generator sees termination and exits cleanly on its own.
    for (i, generator) in generators.into_iter().enumerate() {
        let output = wait_with_timeout(generator, "generator");
        assert!(
            output.status.success(),
            "generator {} failed\nstderr: {}",
            i,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    assert_cleaned_up(&ns);
}

#[test]
fn test_generator_without_supervisor_fails() {
    let ns = namespace("orphan");
    let mut args = vec!["generator", "--namespace", &ns];
    args.extend(TRIANGLE);

    let output = wait_with_timeout(spawn(&args), "generator");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "stderr: {}", stderr);
}

#[test]
fn test_malformed_edge_is_a_startup_error() {
    let ns = namespace("malformed");
    let output = wait_with_timeout(
        spawn(&["generator", "--namespace", &ns, "0-1", "x-y"]),
        "generator",
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid edge list"), "stderr: {}", stderr);
    assert!(stderr.contains("x-y"), "stderr: {}", stderr);
}

#[test]
fn test_second_supervisor_rejected_and_sigterm_cleans_up() {
    let ns = namespace("sigterm");
    let first = spawn(&["supervisor", "--namespace", &ns]);
    wait_for_channel(&ns);

    let second = wait_with_timeout(spawn(&["supervisor", "--namespace", &ns]), "second supervisor");
    assert!(!second.status.success());
    let stderr = String::from_utf8_lossy(&second.stderr);
    assert!(stderr.contains("already exists"), "stderr: {}", stderr);

    // The rejected supervisor must not have removed the first one's objects.
    for file in shm_files(&ns) {
        assert!(file.exists(), "{:?} missing", file);
    }

    // SAFETY: signalling a child process we spawned.
    assert_eq!(unsafe { libc::kill(first.id() as i32, libc::SIGTERM) }, 0);
    let output = wait_with_timeout(first, "supervisor");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_cleaned_up(&ns);
}
