use owo_colors::OwoColorize;

use crate::VERSION;

/// Pipeline stage reported in verbose mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Sift,
    Articles,
    Write,
}

impl Stage {
    fn label(self) -> &'static str {
        match self {
            Stage::Read => "read",
            Stage::Sift => "sift",
            Stage::Articles => "articles",
            Stage::Write => "write",
        }
    }
}

/// Print the verbose banner with the page count and alignment in use
pub fn print_banner(pages: usize, strategy: &str) {
    eprintln!(
        "\n{} {} {}",
        "Blogsift".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!(
        "{}\n",
        format!("diffing {} pages of one template, {} alignment, debug logging on", pages, strategy).dimmed()
    );
}

/// Print the start of a pipeline stage
pub fn print_stage(stage: Stage, message: &str) {
    eprintln!("{:>10} {}", format!("[{}]", stage.label()).dimmed(), message.bright_cyan());
}

/// Print one input page with its size
pub fn print_page(source: &str, html: &str) {
    eprintln!(
        "  {} {}",
        source.bright_white(),
        format!("{}, {} lines", format_size(html.len()), html.lines().count()).dimmed()
    );
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print timing information with color coding
pub fn print_timing(label: &str, duration: std::time::Duration) {
    let ms = duration.as_secs_f64() * 1000.0;
    let label = format!("{}:", label);

    if ms < 50.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "fast".dimmed());
    } else if ms < 100.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "moderate".bright_yellow());
    } else {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "slow".bright_red());
    }
}

/// Print the extraction details of one page
pub fn print_extraction_details(source: &str, extracted: &blogsift_core::ExtractedContent) {
    eprintln!("  {}", source.bright_white());
    eprintln!(
        "    {} {}",
        "Candidates:".dimmed(),
        extracted.candidate_count.to_string().bright_white()
    );
    eprintln!(
        "    {} {}",
        "Weight:".dimmed(),
        format!("{:.1} / {:.1}", extracted.threshold, extracted.total_weight).bright_white()
    );
    eprintln!(
        "    {} {}",
        "Content:".dimmed(),
        format_size(extracted.content.len()).bright_white()
    );
}

/// Print timing summary
pub fn print_timing_summary(total: std::time::Duration, timings: &[(String, std::time::Duration)]) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Timing Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());

    for (label, duration) in timings {
        print_timing(label, *duration);
    }

    eprintln!(
        "  {} {:>8.2}ms\n",
        format!("{}:", "Total").bold().dimmed(),
        total.as_secs_f64() * 1000.0
    );
}

/// Human-readable size of a page in bytes
fn format_size(bytes: usize) -> String {
    match bytes {
        0..1024 => format!("{} B", bytes),
        1024..1_048_576 => format!("{:.1} KB", bytes as f64 / 1024.0),
        _ => format!("{:.1} MB", bytes as f64 / 1_048_576.0),
    }
}
