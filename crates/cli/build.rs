use std::{env, error::Error, fs, path::PathBuf};

use clap_complete::shells::{Bash, Fish, PowerShell, Zsh};

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir)?;

    let mut cmd = clap::Command::new("blogsift")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Blogsift Contributors")
        .about("Extract blog article bodies by diffing pages of one template")
        .arg(
            clap::arg!(<PAGES> ... "HTML pages rendered from the same template (at least two)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (html, text, json)")
                .value_name("FORMAT")
                .default_value("html")
                .value_parser(["html", "text", "json"]),
        )
        .arg(
            clap::arg!(--metric <METRIC> "Candidate weighting")
                .default_value("constant")
                .value_parser(["constant", "text-length", "markup-length"]),
        )
        .arg(clap::arg!(--threshold <RATIO> "Share of the total weight a subtree needs to be selected").default_value("0.5"))
        .arg(
            clap::Arg::new("text_only")
                .long("text-only")
                .action(clap::ArgAction::SetTrue)
                .help("Only count differing text, not differing elements"),
        )
        .arg(
            clap::Arg::new("min_common")
                .long("min-common")
                .value_name("NUM")
                .default_value("0")
                .help("Common prefix/suffix length that must be exceeded before it is stripped"),
        )
        .arg(
            clap::Arg::new("keep_images")
                .long("keep-images")
                .action(clap::ArgAction::SetTrue)
                .help("Keep images in text output"),
        )
        .arg(
            clap::arg!(--strategy <STRATEGY> "Row alignment")
                .default_value("structural")
                .value_parser(["structural", "matching"]),
        )
        .arg(clap::arg!(--outline "Print the content tree outline of every page to stderr"))
        .arg(
            clap::arg!(--articles <FILE> "JSON array of feed articles, one per page, to fill in from the pages")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::Arg::new("force_diff")
                .long("force-diff")
                .action(clap::ArgAction::SetTrue)
                .requires("articles")
                .help("Always diff the pages when processing articles"),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(Bash, &mut cmd, "blogsift", &completions_dir)?;
    clap_complete::generate_to(Zsh, &mut cmd, "blogsift", &completions_dir)?;
    clap_complete::generate_to(Fish, &mut cmd, "blogsift", &completions_dir)?;
    clap_complete::generate_to(PowerShell, &mut cmd, "blogsift", &completions_dir)?;

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
    Ok(())
}
