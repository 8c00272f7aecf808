use vergen_gitcl::{BuildBuilder, Emitter, GitclBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = BuildBuilder::default().build_date(true).build()?;
    let git = GitclBuilder::default().sha(true).build()?;

    let emitted = Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&git)?
        .emit();

    // ソース tarball からのビルドなど git が使えない環境向け
    if emitted.is_err() {
        let sha = std::env::var("GIT_COMMIT")
            .map(|sha| sha.chars().take(7).collect::<String>())
            .unwrap_or_else(|_| "unknown".to_string());
        println!("cargo::rustc-env=VERGEN_GIT_SHA={sha}");
        println!("cargo::rustc-env=VERGEN_BUILD_DATE=unknown");
    }

    Ok(())
}
