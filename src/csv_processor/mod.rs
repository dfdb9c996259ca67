pub mod reader;
pub mod table;
pub mod writer;

pub use reader::{file_exists, parse_delimiter, CsvTableReader};
pub use table::{Row, Table};
pub use writer::{write_table, CsvStreamWriter};
