use colored::Colorize;

use altofs::{AltoImage, DirectoryEntry, FileEntry, Geometry, IntegrityReport, PageCounts, ScanControl};

/// Prints geometry, page counts, integrity status, and a recursive root
/// directory listing — the full `-s` summary (§F).
pub fn print_summary(image_path: &str, geometry: Geometry, image: &AltoImage, report: &IntegrityReport) {
    println!(
        "{} ({} cyl, {} hd, {} sec, {} pages)",
        image_path.bold(),
        geometry.num_cylinders,
        geometry.num_heads,
        geometry.num_sectors,
        geometry.num_pages(),
    );

    print_page_counts(image.page_counts());
    print_integrity(report);

    println!("{}", "root:".bold());
    if let Ok(root) = FileEntry::root(image.store()) {
        if let Err(e) = print_directory(image, root, 1) {
            println!("  {} {e}", "error:".red());
        }
    }
}

fn print_page_counts(counts: PageCounts) {
    println!(
        "pages: {} total, {} free, {} bad",
        counts.total, counts.free, counts.bad
    );
}

fn print_integrity(report: &IntegrityReport) {
    if report.is_ok() {
        println!("{}", "integrity: ok".green());
    } else {
        println!(
            "{}",
            format!("integrity: {} violation(s)", report.violations.len()).red()
        );
        for violation in &report.violations {
            println!("  {} {violation}", "-".dimmed());
        }
    }
}

fn print_directory(image: &AltoImage, dir: FileEntry, depth: usize) -> Result<(), altofs::Error> {
    let mut children: Vec<DirectoryEntry> = Vec::new();
    image.scan_directory(dir, |entry| {
        children.push(entry.clone());
        ScanControl::Continue
    })?;

    for entry in &children {
        let indent = "  ".repeat(depth);
        let is_dir = image
            .store()
            .page(entry.file.leader_vda)
            .map(|p| p.label.serial_number.is_directory())
            .unwrap_or(false);

        if is_dir {
            println!("{indent}{}", format!("<{}>", entry.filename).cyan());
            print_directory(image, entry.file, depth + 1)?;
        } else {
            println!("{indent}{}", entry.filename);
        }
    }

    Ok(())
}
