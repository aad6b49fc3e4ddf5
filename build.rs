use vergen_gitcl::{CargoBuilder, Emitter, GitclBuilder};

fn main() {
	if emit().is_err() {
		println!("cargo:rustc-env=VERGEN_GIT_SHA=unknown");
		println!(
			"cargo:rustc-env=VERGEN_CARGO_TARGET_TRIPLE={}",
			std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string())
		);
	}
}

fn emit() -> Result<(), Box<dyn std::error::Error>> {
	let cargo = CargoBuilder::all_cargo()?;
	let git = GitclBuilder::all_git()?;

	Emitter::default().add_instructions(&cargo)?.add_instructions(&git)?.emit()?;

	Ok(())
}
