//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

use assert_cmd::Command;

#[test]
fn build_kernel()
{
	let outdir = tempfile::tempdir().unwrap();
	let mut cmd = Command::cargo_bin("weft").unwrap();
	cmd.arg("--out-dir");
	cmd.arg(outdir.path());
	cmd.arg("tests/samples/kernel_fp.tree");
	cmd.assert().success();

	let output = outdir.path().join("kernel_fp.F90");
	let code = std::fs::read_to_string(output).unwrap();
	assert!(code.starts_with("SUBROUTINE kernel(n, x, y)\n"));
	assert!(code.contains("CALL helper(y, n)"));
}

#[test]
fn build_with_subcommand()
{
	let mut cmd = Command::cargo_bin("weft").unwrap();
	cmd.arg("build");
	cmd.arg("--frontend");
	cmd.arg("ofp");
	cmd.arg("tests/samples/kernel_ofp.tree");
	cmd.assert().success();
}

#[test]
fn dump_omni_kernel()
{
	let mut cmd = Command::cargo_bin("weft").unwrap();
	cmd.arg("dump");
	cmd.arg("--frontend");
	cmd.arg("omni");
	cmd.arg("tests/samples/kernel_omni.tree");
	let output = cmd.assert().success().get_output().stdout.clone();
	let text = String::from_utf8(output).unwrap();
	assert!(text.contains("Allocation"));
}

#[test]
fn build_in_dependency_order()
{
	let mut cmd = Command::cargo_bin("weft").unwrap();
	cmd.arg("--strict");
	cmd.arg("tests/samples/physics_fp.tree");
	cmd.arg("tests/samples/driver_fp.tree");
	cmd.assert().success();
}

#[test]
fn build_with_config_file()
{
	let dir = tempfile::tempdir().unwrap();
	let config = dir.path().join("weft.toml");
	std::fs::write(&config, "frontend = \"omni\"\nstrict_scoping = true\n")
		.unwrap();
	let mut cmd = Command::cargo_bin("weft").unwrap();
	cmd.arg("--config");
	cmd.arg(&config);
	cmd.arg("tests/samples/kernel_omni.tree");
	cmd.assert().success();
}

#[test]
fn fail_on_unknown_config_key()
{
	let dir = tempfile::tempdir().unwrap();
	let config = dir.path().join("weft.toml");
	std::fs::write(&config, "frontent = \"omni\"\n").unwrap();
	let mut cmd = Command::cargo_bin("weft").unwrap();
	cmd.arg("--config");
	cmd.arg(&config);
	cmd.arg("tests/samples/kernel_fp.tree");
	cmd.assert().failure();
}

#[test]
fn fail_on_unknown_frontend()
{
	let mut cmd = Command::cargo_bin("weft").unwrap();
	cmd.arg("--frontend");
	cmd.arg("regex");
	cmd.arg("tests/samples/kernel_fp.tree");
	cmd.assert().failure();
}

#[test]
fn fail_to_build_wrong_dialect()
{
	let mut cmd = Command::cargo_bin("weft").unwrap();
	cmd.arg("--frontend");
	cmd.arg("omni");
	cmd.arg("tests/samples/kernel_fp.tree");
	cmd.assert().failure();
}

#[test]
fn fail_to_build_undeclared_when_strict()
{
	let mut cmd = Command::cargo_bin("weft").unwrap();
	cmd.arg("--strict");
	cmd.arg("tests/samples/invalid/undeclared.tree");
	cmd.assert().failure();

	let mut cmd = Command::cargo_bin("weft").unwrap();
	cmd.arg("tests/samples/invalid/undeclared.tree");
	cmd.assert().success();
}

#[test]
fn fail_to_build_unterminated()
{
	let mut cmd = Command::cargo_bin("weft").unwrap();
	cmd.arg("tests/samples/invalid/unterminated.tree");
	cmd.assert().failure();
}
