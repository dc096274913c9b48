use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

pub mod shared_types;
pub mod error;
pub mod param_validator;
pub mod color;
pub mod palette;
pub mod block_scan;
pub mod bit_depth;
pub mod bin_header;
pub mod emitter;
pub mod block_compress;
pub mod tile_gm2;
pub mod scheme;
pub mod image_get;
pub mod image_transform;
pub mod table_make;

use crate::{
	error::Warning,
	param_validator::Args,
	shared_types::{ExportParameters, SchemeRequest, SourceImage},
	table_make::ExportOutcome,
};


pub fn main() -> anyhow::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let args: Args = Args::parse();
	let (params, request, warnings): (ExportParameters, SchemeRequest, Vec<Warning>) =
		param_validator::validate(&args).context("Invalid parameters")?;

	for warning in &warnings {
		warn!("{}", warning);
	}

	let instant: Instant = Instant::now();

	let image: SourceImage = image_get::load(&params.input_path)
		.with_context(|| format!("Could not read '{}'", params.input_path.display()))?;

	info!("Converting '{}' ({}x{})", params.input_path.display(), image.width, image.height);

	let outcome: ExportOutcome = table_make::export(image, &params, request)?;

	for warning in &outcome.report.warnings {
		warn!("{}", warning);
	}

	table_make::write_output(&params.output_path, &outcome.bytes)
		.with_context(|| format!("Could not write '{}'", params.output_path.display()))?;

	if let Some(scheme) = outcome.report.scheme {
		info!("Compressor: {}", scheme.short_name());
	}

	info!(
		"Wrote '{}': {} blocks ({} skipped), {} data bytes, {} bytes total in {}ms",
		params.output_path.display(),
		outcome.report.block_count,
		outcome.report.skipped,
		outcome.report.data_bytes,
		outcome.report.total_bytes,
		instant.elapsed().as_millis(),
	);

	Ok(())
}
