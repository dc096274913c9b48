use std::fmt::Write as _;

use crate::shared_types::{DataFormat, OutputFormat};


/// Element type of a table.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum TableKind {
	U8,
	U16,
}


/// Write-only interface the export pipeline drives. Every sink keeps its
/// own running byte count, so a counting sink and a real one always agree.
pub trait TableEmitter {
	/// Comment lines at the very top of text outputs.
	fn write_banner(&mut self, _lines: &[String]) {}
	fn begin_table(&mut self, kind: TableKind, name: &str, comment: &str);
	/// Marks the start of block `number` at the current offset.
	fn write_block_header(&mut self, _number: usize) {}
	fn write_comment_line(&mut self, _comment: &str) {}
	/// One annotated line of 1, 2 or 4 bytes.
	fn write_bytes(&mut self, values: &[u8], comment: &str);
	/// One annotated line of 1 or 2 little-endian words.
	fn write_words(&mut self, values: &[u16], comment: &str);
	fn begin_line(&mut self) {}
	fn write_raw_byte(&mut self, value: u8);
	/// A byte that reads as a pixel pattern.
	fn write_bits_byte(&mut self, value: u8) {
		self.write_raw_byte(value);
	}
	fn end_line(&mut self) {}
	fn end_table(&mut self, _comment: &str) {}
	fn total_bytes(&self) -> u32;
}


/// Style actually written for `dialect`. C only has `0x`, `0b` and decimal
/// literals, the assembler spellings fall back to those.
fn dialect_format(format: DataFormat, dialect: OutputFormat) -> DataFormat {
	if dialect == OutputFormat::Asm {
		return format;
	}

	match format {
		DataFormat::HexaAsm | DataFormat::HexaPascal | DataFormat::HexaBasic | DataFormat::HexaAnd | DataFormat::HexaSharp => DataFormat::HexaC,
		DataFormat::Binary | DataFormat::BinaryAsm => DataFormat::BinaryC,
		_ => format,
	}
}


/// Renders `value` in the selected numeric style.
pub fn format_number(value: u32, bytes: u8, format: DataFormat, dialect: OutputFormat) -> String {
	let digits: usize = bytes as usize * 2;
	let bits: usize = bytes as usize * 8;

	match dialect_format(format, dialect) {
		DataFormat::Decimal => format!("{:3}", value),
		DataFormat::Hexa | DataFormat::HexaC => format!("0x{:0width$X}", value, width = digits),
		DataFormat::HexaAsm => format!("0{:0width$X}h", value, width = digits),
		DataFormat::HexaPascal => format!("${:0width$X}", value, width = digits),
		DataFormat::HexaBasic => format!("&H{:0width$X}", value, width = digits),
		DataFormat::HexaAnd => format!("&{:0width$X}", value, width = digits),
		DataFormat::HexaSharp => format!("#{:0width$X}", value, width = digits),
		DataFormat::Binary | DataFormat::BinaryAsm => format!("{:0width$b}b", value, width = bits),
		DataFormat::BinaryC => format!("0b{:0width$b}", value, width = bits),
	}
}

fn pattern_text(value: u8) -> String {
	(0..8).rev().map(|bit| if value & (1 << bit) != 0 { '#' } else { '.' }).collect()
}


/// C or assembler source table.
pub struct TextSink {
	dialect: OutputFormat,
	format: DataFormat,
	define: bool,
	kind: TableKind,
	out: String,
	total_bytes: u32,
}

impl TextSink {
	pub fn new(dialect: OutputFormat, format: DataFormat, define: bool) -> TextSink {
		TextSink {
			dialect,
			format,
			define,
			kind: TableKind::U8,
			out: String::new(),
			total_bytes: 0,
		}
	}

	pub fn text(&self) -> &str {
		&self.out
	}

	fn comment_prefix(&self) -> &'static str {
		match self.dialect {
			OutputFormat::Asm => ";",
			_ => "//",
		}
	}

	fn number(&self, value: u32, bytes: u8) -> String {
		format_number(value, bytes, self.format, self.dialect)
	}

	fn numbered_line(&mut self, numbers: Vec<String>, word: bool, comment: &str) {
		let prefix: &str = self.comment_prefix();
		match self.dialect {
			OutputFormat::Asm => {
				let directive: &str = if word { ".dw" } else { ".db" };
				let _ = writeln!(self.out, "\t{} {} {} {}", directive, numbers.join(", "), prefix, comment);
			},
			_ => {
				let _ = writeln!(self.out, "\t{}, {} {}", numbers.join(", "), prefix, comment);
			},
		}
	}
}

impl TableEmitter for TextSink {
	fn write_banner(&mut self, lines: &[String]) {
		let prefix: &str = self.comment_prefix();
		for line in lines {
			let _ = writeln!(self.out, "{} {}", prefix, line);
		}
	}

	fn begin_table(&mut self, kind: TableKind, name: &str, comment: &str) {
		self.kind = kind;
		match self.dialect {
			OutputFormat::Asm => {
				let _ = write!(self.out, "\n; {}\n{}:\n", comment, name);
			},
			_ => {
				let c_type: &str = match kind {
					TableKind::U8 => "const unsigned char",
					TableKind::U16 => "const unsigned short",
				};
				if self.define {
					let _ = write!(self.out,
						"\n#ifndef D_{name}\n\t#define D_{name}\n#endif\n// {comment}\nD_{name} {c_type} {name}[] =\n{{\n",
						name = name, comment = comment, c_type = c_type);
				}
				else {
					let _ = write!(self.out, "\n// {}\n{} {}[] =\n{{\n", comment, c_type, name);
				}
			},
		}
	}

	fn write_block_header(&mut self, number: usize) {
		let prefix: &str = self.comment_prefix();
		let _ = writeln!(self.out, "{} Block[{}] (offset:{})", prefix, number, self.total_bytes);
	}

	fn write_comment_line(&mut self, comment: &str) {
		let prefix: &str = self.comment_prefix();
		let _ = writeln!(self.out, "{} {}", prefix, comment);
	}

	fn write_bytes(&mut self, values: &[u8], comment: &str) {
		debug_assert!(matches!(values.len(), 1 | 2 | 4));
		let numbers: Vec<String> = values.iter().map(|&v| self.number(v as u32, 1)).collect();
		self.numbered_line(numbers, false, comment);
		self.total_bytes += values.len() as u32;
	}

	fn write_words(&mut self, values: &[u16], comment: &str) {
		debug_assert!(matches!(values.len(), 1 | 2));

		// Words inside a byte table are spelled as little-endian byte pairs
		if self.kind == TableKind::U8 {
			let numbers: Vec<String> = values.iter()
				.flat_map(|v| v.to_le_bytes())
				.map(|b| self.number(b as u32, 1))
				.collect();
			self.numbered_line(numbers, false, comment);
		}
		else {
			let numbers: Vec<String> = values.iter().map(|&v| self.number(v as u32, 2)).collect();
			self.numbered_line(numbers, true, comment);
		}
		self.total_bytes += 2 * values.len() as u32;
	}

	fn begin_line(&mut self) {
		match self.dialect {
			OutputFormat::Asm => self.out.push_str("\t.db "),
			_ => self.out.push('\t'),
		}
	}

	fn write_raw_byte(&mut self, value: u8) {
		let number: String = self.number(value as u32, 1);
		match self.dialect {
			OutputFormat::Asm => {
				if !self.out.ends_with(".db ") {
					self.out.push_str(", ");
				}
				self.out.push_str(&number);
			},
			_ => {
				let _ = write!(self.out, "{}, ", number);
			},
		}
		self.total_bytes += 1;
	}

	fn write_bits_byte(&mut self, value: u8) {
		match self.dialect {
			OutputFormat::Asm => self.write_raw_byte(value),
			_ => {
				let number: String = self.number(value as u32, 1);
				let _ = write!(self.out, "{}, /* {} */ ", number, pattern_text(value));
				self.total_bytes += 1;
			},
		}
	}

	fn end_line(&mut self) {
		self.out.push('\n');
	}

	fn end_table(&mut self, comment: &str) {
		if self.dialect != OutputFormat::Asm {
			self.out.push_str("};\n");
		}
		if !comment.is_empty() {
			let prefix: &str = self.comment_prefix();
			let _ = writeln!(self.out, "{} {}", prefix, comment);
		}
	}

	fn total_bytes(&self) -> u32 {
		self.total_bytes
	}
}


/// Raw bytes, words little-endian.
#[derive(Default)]
pub struct BinarySink {
	out: Vec<u8>,
}

impl BinarySink {
	pub fn bytes(&self) -> &[u8] {
		&self.out
	}
}

impl TableEmitter for BinarySink {
	fn begin_table(&mut self, _kind: TableKind, _name: &str, _comment: &str) {}

	fn write_bytes(&mut self, values: &[u8], _comment: &str) {
		self.out.extend_from_slice(values);
	}

	fn write_words(&mut self, values: &[u16], _comment: &str) {
		for value in values {
			self.out.extend_from_slice(&value.to_le_bytes());
		}
	}

	fn write_raw_byte(&mut self, value: u8) {
		self.out.push(value);
	}

	fn total_bytes(&self) -> u32 {
		self.out.len() as u32
	}
}


/// Discards everything but the byte count. Used by the benchmark.
#[derive(Default)]
pub struct CountingSink {
	total_bytes: u32,
}

impl TableEmitter for CountingSink {
	fn begin_table(&mut self, _kind: TableKind, _name: &str, _comment: &str) {}

	fn write_bytes(&mut self, values: &[u8], _comment: &str) {
		self.total_bytes += values.len() as u32;
	}

	fn write_words(&mut self, values: &[u16], _comment: &str) {
		self.total_bytes += 2 * values.len() as u32;
	}

	fn write_raw_byte(&mut self, _value: u8) {
		self.total_bytes += 1;
	}

	fn total_bytes(&self) -> u32 {
		self.total_bytes
	}
}


/// The closed set of sinks an export run can write to.
pub enum Sink {
	Text(TextSink),
	Binary(BinarySink),
}

impl Sink {
	pub fn for_output(format: OutputFormat, data_format: DataFormat, define: bool) -> Sink {
		match format {
			OutputFormat::Bin => Sink::Binary(BinarySink::default()),
			_ => Sink::Text(TextSink::new(format, data_format, define)),
		}
	}

	pub fn emitter(&mut self) -> &mut dyn TableEmitter {
		match self {
			Sink::Text(sink) => sink,
			Sink::Binary(sink) => sink,
		}
	}

	/// Final file content.
	pub fn into_output(self) -> Vec<u8> {
		match self {
			Sink::Text(sink) => sink.out.into_bytes(),
			Sink::Binary(sink) => sink.out,
		}
	}
}
