mod cli;
mod report;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use altofs::{AltoImage, Geometry};
use cli::Cli;

fn parse_geometry(spec: &str) -> anyhow::Result<Geometry> {
    let parts: Vec<&str> = spec.split(',').collect();
    let [cylinders, heads, sectors] = parts[..] else {
        anyhow::bail!("geometry must be `cylinders,heads,sectors`, got {spec:?}");
    };
    Ok(Geometry::new(cylinders.parse()?, heads.parse()?, sectors.parse()?)?)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let geometry = match &cli.geometry {
        Some(spec) => parse_geometry(spec)?,
        None => Geometry::DEFAULT,
    };

    let image = AltoImage::open(&cli.image, geometry)?;
    let integrity_report = image.check_integrity();

    if cli.summary || cli.extract.is_none() {
        report::print_summary(&cli.image.display().to_string(), geometry, &image, &integrity_report);
    }

    if let Some(alto_path) = &cli.extract {
        let file = image.find_file(alto_path).or_else(|_| {
            tracing::warn!(path = %alto_path, "not found via directory lookup, trying scavenge");
            let name = alto_path
                .rsplit(|c| c == '<' || c == '>')
                .next()
                .unwrap_or(alto_path);
            image.scavenge_file(name)
        })?;

        let dest = cli.output.clone().unwrap_or_else(|| {
            let name = alto_path
                .rsplit(|c| c == '<' || c == '>')
                .next()
                .unwrap_or(alto_path);
            std::path::PathBuf::from(name)
        });

        let bytes = image.extract_file(file, &dest)?;
        println!("extracted {} bytes to {}", bytes, dest.display());
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose >= 2 {
        EnvFilter::new("debug")
    } else if cli.verbose == 1 {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env().add_directive("altofs=warn".parse().expect("valid log directive"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    run(&cli)
}
