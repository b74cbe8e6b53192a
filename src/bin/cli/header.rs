//! Header inspection command

use dbfsplit::io::dbf::charset;
use dbfsplit::io::DataSource;
use dbfsplit::Result;
use std::path::Path;

/// Print the header fields and the descriptor table.
///
/// Usage: dbfsplit header FILE
pub fn run(file: &Path) -> Result<()> {
    let source = DataSource::from_path(file);
    let file_length = source.len()?;
    let header = source.read_header()?;

    println!("File:            {}", file.display());
    println!("File length:     {}", file_length);
    println!("Signature:       0x{:02X}", header.signature());
    match header.last_update() {
        Some(date) => println!("Last update:     {}", date),
        None => println!("Last update:     (invalid)"),
    }
    println!("Records:         {}", header.record_count());
    println!("Header length:   {}", header.header_length());
    println!("Record length:   {}", header.record_length());
    println!(
        "Language driver: 0x{:02X} ({})",
        header.language_driver(),
        charset::resolve(None, header.language_driver()).name()
    );
    if file_length != header.expected_file_length() {
        println!(
            "Note:            record count implies {} bytes",
            header.expected_file_length()
        );
    }

    println!();
    println!("{:<4} {:<10} {:<4} {:>6} {:>8}", "#", "Name", "Type", "Length", "Decimals");
    for (i, field) in header.fields().iter().enumerate() {
        println!(
            "{:<4} {:<10} {:<4} {:>6} {:>8}",
            i,
            field.name(),
            field.field_type().as_u8() as char,
            field.length(),
            field.decimal_count()
        );
    }
    Ok(())
}
