//! CLI integration tests for extplan.
//!
//! These tests run the binary against small on-disk projects. The host's
//! CUDA installation is hidden: every project pins `assume_runtime = false`
//! and the CUDA variables are removed from the child environment.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const BACKEND_FILES: &[&str] = &[
    "pybind_cpu.cpp",
    "pybind_cuda.cu",
    "conv/conv_cpu.cpp",
    "conv/conv_cuda.cu",
    "hash/hash_cpu.cpp",
    "hash/hash_cuda.cu",
];

const OFFLINE_CONFIG: &str = "[policy]\nassume_runtime = false\n";

/// Get the extplan binary command, isolated from the host environment.
fn extplan(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("extplan").unwrap();
    cmd.env_remove("FORCE_CUDA")
        .env_remove("CUDA_HOME")
        .env_remove("CUDA_PATH")
        .env_remove("EXTPLAN_LOG")
        .env_remove("EXTPLAN_PROJECT_DIR")
        .env("HOME", home);
    cmd
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Create a torchsparse-shaped project with an offline config.
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "extplan.toml", OFFLINE_CONFIG);
    write(tmp.path(), "torchsparse/version.py", "__version__ = '2.1.0'\n");
    for file in BACKEND_FILES {
        write(tmp.path(), &format!("torchsparse/backend/{}", file), "// kernel\n");
    }
    tmp
}

fn plan_json(tmp: &TempDir, extra: &[&str], force: bool) -> serde_json::Value {
    let mut cmd = extplan(tmp.path());
    cmd.args(["plan", "--json"]).args(extra).current_dir(tmp.path());
    if force {
        cmd.env("FORCE_CUDA", "1");
    }
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{:?}", output);
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// extplan plan
// ============================================================================

#[test]
fn test_plan_fallback_without_toolkit() {
    let tmp = project();
    let plan = plan_json(&tmp, &["--os", "posix"], false);

    assert_eq!(plan["backend"], "fallback");
    assert_eq!(plan["device"], "cpu");
    assert_eq!(plan["reason"], "no_runtime");
    assert_eq!(plan["version"], "2.1.0");

    let sources: Vec<&str> = plan["sources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert_eq!(sources.len(), 3);
    assert!(sources[0].ends_with("pybind_cpu.cpp"));
    assert!(sources.iter().all(|s| !s.ends_with(".cu")));

    assert!(plan["extra_compile_args"].get("nvcc").is_none());
    assert_eq!(
        plan["extra_compile_args"]["cxx"],
        serde_json::json!(["-g", "-O3", "-fopenmp", "-std=c++17"])
    );
    assert_eq!(plan["define_macros"], serde_json::json!([]));
}

#[test]
fn test_plan_forced_accelerated_on_windows() {
    let tmp = project();
    let plan = plan_json(&tmp, &["--os", "windows", "--no-verify"], true);

    assert_eq!(plan["backend"], "accelerated");
    assert_eq!(plan["reason"], "forced");
    assert_eq!(plan["sources"].as_array().unwrap().len(), 5);
    assert_eq!(plan["define_macros"][0][0], "SPARSEHASH_WINDOWS");
    assert_eq!(
        plan["extra_compile_args"]["nvcc"],
        serde_json::json!(["-O3", "--use-local-env", "-std=c++17", "-Xcompiler", "/MD", "-w"])
    );
}

#[test]
fn test_plan_force_flag_matches_env_var() {
    let tmp = project();
    let by_flag = plan_json(&tmp, &["--os", "posix", "--no-verify", "--force-accelerated"], false);
    let by_env = plan_json(&tmp, &["--os", "posix", "--no-verify"], true);

    assert_eq!(by_flag["fingerprint"], by_env["fingerprint"]);
}

#[test]
fn test_plan_writes_output_and_compile_commands() {
    let tmp = project();

    extplan(tmp.path())
        .args([
            "plan",
            "--os",
            "posix",
            "--output",
            "out/plan.json",
            "--emit-compile-commands",
        ])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Backend:     fallback (cpu)"));

    assert!(tmp.path().join("out/plan.json").exists());
    let cc = fs::read_to_string(tmp.path().join("compile_commands.json")).unwrap();
    assert!(cc.contains("conv_cpu.cpp"));
}

#[test]
fn test_plan_missing_source_root() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "extplan.toml", OFFLINE_CONFIG);

    extplan(tmp.path())
        .args(["plan", "--os", "posix"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("source root not found"))
        .stderr(predicate::str::contains("[sources] root"));
}

#[test]
fn test_plan_missing_entry_point() {
    let tmp = project();
    fs::remove_file(tmp.path().join("torchsparse/backend/pybind_cpu.cpp")).unwrap();

    extplan(tmp.path())
        .args(["plan", "--os", "posix"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("entry point not found"))
        .stderr(predicate::str::contains("pybind_cpu.cpp"));
}

#[test]
fn test_plan_bad_version_file() {
    let tmp = project();
    write(
        tmp.path(),
        "extplan.toml",
        "[extension]\nversion_file = \"VERSION\"\n[policy]\nassume_runtime = false\n",
    );
    write(tmp.path(), "VERSION", "2.1.0\n");

    extplan(tmp.path())
        .args(["plan"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not parse the extension version"));
}

#[test]
fn test_project_dir_flag() {
    let tmp = project();
    let elsewhere = TempDir::new().unwrap();

    extplan(tmp.path())
        .args(["-C"])
        .arg(tmp.path())
        .args(["sources", "--backend", "fallback"])
        .current_dir(elsewhere.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "torchsparse/backend/pybind_cpu.cpp",
        ));
}

// ============================================================================
// extplan backend / sources / flags / toolchain
// ============================================================================

#[test]
fn test_backend_reports_decision() {
    let tmp = project();

    extplan(tmp.path())
        .args(["backend"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout("cpu\n")
        .stderr(predicate::str::contains("no CUDA runtime available"));

    extplan(tmp.path())
        .args(["backend", "--no-verify"])
        .env("FORCE_CUDA", "1")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout("cuda\n");
}

#[test]
fn test_sources_lists_accelerated_set() {
    let tmp = project();

    let output = extplan(tmp.path())
        .args(["sources", "--backend", "accelerated"])
        .current_dir(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "torchsparse/backend/pybind_cuda.cu");
    assert_eq!(lines.len(), 5);
    assert!(!lines.contains(&"torchsparse/backend/pybind_cpu.cpp"));
}

#[test]
fn test_flags_windows_has_sparsehash_macro() {
    let tmp = project();

    extplan(tmp.path())
        .args(["flags", "--os", "windows", "--backend", "accelerated"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("SPARSEHASH_WINDOWS"))
        .stdout(predicate::str::contains("/MD /O2 /EHsc /std:c++17 /Zc:__cplusplus"))
        .stdout(predicate::str::contains("nvcc:"));
}

#[test]
fn test_flags_posix_fallback() {
    let tmp = project();

    extplan(tmp.path())
        .args(["flags", "--os", "posix", "--backend", "fallback"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("-g -O3 -fopenmp -std=c++17"))
        .stdout(predicate::str::contains("SPARSEHASH_WINDOWS").not())
        .stdout(predicate::str::contains("nvcc:").not());
}

#[test]
fn test_flags_respects_config() {
    let tmp = project();
    write(
        tmp.path(),
        "extplan.toml",
        "[compile]\ncpp_std = \"20\"\nnvcc_flags = [\"--expt-relaxed-constexpr\"]\n\
         [policy]\nassume_runtime = false\nsuppress_device_warnings = false\n",
    );

    extplan(tmp.path())
        .args(["flags", "--os", "posix", "--backend", "accelerated"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("-O3 -std=c++20 --expt-relaxed-constexpr"))
        .stdout(predicate::str::contains(" -w").not());
}

#[test]
fn test_toolchain_shows_environment() {
    let tmp = project();

    extplan(tmp.path())
        .args(["toolchain", "--os", "posix"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("OS family:    posix"))
        .stdout(predicate::str::contains("CUDA runtime: not available"))
        .stdout(predicate::str::contains("Backend: fallback (cpu)"));
}

// ============================================================================
// extplan manifest
// ============================================================================

#[test]
fn test_manifest_write_and_check() {
    let tmp = project();
    write(
        tmp.path(),
        "extplan.toml",
        "[sources]\nmanifest = \"torchsparse/backend/sources.toml\"\n\
         [policy]\nassume_runtime = false\n",
    );

    extplan(tmp.path())
        .args(["manifest", "--write"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let manifest = fs::read_to_string(tmp.path().join("torchsparse/backend/sources.toml")).unwrap();
    assert!(manifest.contains("conv/conv_cpu.cpp"));
    assert!(manifest.contains("hash/hash_cuda.cu"));
    assert!(!manifest.contains("pybind"));

    extplan(tmp.path())
        .args(["manifest", "--check"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));

    // A new kernel on disk makes the manifest stale, for checking and planning.
    write(tmp.path(), "torchsparse/backend/pool/pool_cpu.cpp", "// kernel\n");

    extplan(tmp.path())
        .args(["manifest", "--check"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not listed"))
        .stderr(predicate::str::contains("pool_cpu.cpp"));

    extplan(tmp.path())
        .args(["plan", "--os", "posix"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("source manifest is out of date"));
}

#[test]
fn test_manifest_print() {
    let tmp = project();

    extplan(tmp.path())
        .args(["manifest"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("fallback = ["))
        .stdout(predicate::str::contains("accelerated = ["));

    assert!(!tmp.path().join("torchsparse/backend/sources.toml").exists());
}

// ============================================================================
// extplan build
// ============================================================================

#[test]
fn test_build_dry_run() {
    let tmp = project();

    extplan(tmp.path())
        .args(["build", "--dry-run", "--os", "posix"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("EXTPLAN_PLAN="))
        .stdout(predicate::str::contains("python setup.py build_ext --inplace"));

    assert!(tmp.path().join("build/extplan/plan.json").exists());
}

#[cfg(unix)]
#[test]
fn test_build_failure_exit_code() {
    let tmp = project();
    write(
        tmp.path(),
        "extplan.toml",
        "[build]\ncommand = [\"sh\", \"-c\", \"exit 4\"]\n[policy]\nassume_runtime = false\n",
    );

    extplan(tmp.path())
        .args(["build"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("extension build failed with exit code 4"));
}

// ============================================================================
// extplan completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();

    extplan(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("extplan"));
}
