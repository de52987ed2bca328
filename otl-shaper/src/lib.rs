//! Reading and applying OpenType layout tables.
//!
//! This crate decodes the GSUB and GPOS tables (with their shared Coverage,
//! ClassDef, Anchor and lookup machinery), the GDEF glyph classification
//! table, the legacy `kern` table, and the `hhea`/`hmtx` horizontal metrics
//! pair, and drives decoded lookups across a glyph sequence to produce a
//! positioned glyph run.
//!
//! Glyph outlines, variations, and complex-script shaping passes are out of
//! scope; see the module docs for the details of what each table module
//! supports.

#![deny(rustdoc::broken_intra_doc_links)]

mod font_data;
mod offset;
mod read;
mod table_provider;
mod write;

pub mod metrics;
pub mod shape;
pub mod tables;

#[cfg(test)]
#[path = "tests/test_helpers.rs"]
mod test_helpers;

pub use font_data::FontData;
pub use offset::{Offset, ResolveOffset};
pub use read::{FontRead, FontReadWithArgs, ReadArgs, ReadError};
pub use table_provider::TableProvider;

pub use metrics::{best_rational_approximation, decode_hmtx, HmtxInfo};
pub use shape::{
    kern_as_lookup, load_gpos, load_gsub, shape, shape_with_budget, LookupList, ShapeError,
    ShapedGlyph, Shaper,
};

/// Public re-export of the scalar types crate.
pub use types;

use types::{BigEndian, FixedSize, Offset32, Tag, CFF_SFNT_VERSION, TRUE_SFNT_VERSION, TT_SFNT_VERSION};

/// The OpenType [Table Directory](https://docs.microsoft.com/en-us/typography/opentype/spec/otff#table-directory)
#[derive(Clone)]
pub struct TableDirectory<'a> {
    data: FontData<'a>,
    table_records: &'a [TableRecord],
}

impl<'a> FontRead<'a> for TableDirectory<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let num_tables: u16 = data.read_at(4)?;
        // sfnt version (u32) + numTables, searchRange, entrySelector, rangeShift
        let records_start = 12;
        let records_end = records_start + num_tables as usize * TableRecord::RAW_BYTE_LEN;
        let table_records = data.read_array(records_start..records_end)?;
        Ok(TableDirectory {
            data,
            table_records,
        })
    }
}

impl<'a> TableDirectory<'a> {
    /// 0x00010000, 0x4F54544F ('OTTO') or 0x74727565 ('true')
    pub fn sfnt_version(&self) -> u32 {
        self.data.read_at(0).unwrap_or_default()
    }

    /// Number of tables.
    pub fn num_tables(&self) -> u16 {
        self.table_records.len() as u16
    }

    /// Table records array, one for each top-level table in the font
    pub fn table_records(&self) -> &'a [TableRecord] {
        self.table_records
    }
}

/// Record for a table in a font.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
#[repr(packed)]
pub struct TableRecord {
    /// Table identifier.
    pub tag: BigEndian<Tag>,
    /// Checksum for the table.
    pub checksum: BigEndian<u32>,
    /// Offset from the beginning of the font data.
    pub offset: BigEndian<Offset32>,
    /// Length of the table.
    pub length: BigEndian<u32>,
}

// # SAFETY: all fields are raw big-endian byte arrays with no padding.
unsafe impl bytemuck::Zeroable for TableRecord {}
unsafe impl bytemuck::AnyBitPattern for TableRecord {}

impl FixedSize for TableRecord {
    const RAW_BYTE_LEN: usize =
        Tag::RAW_BYTE_LEN + u32::RAW_BYTE_LEN + Offset32::RAW_BYTE_LEN + u32::RAW_BYTE_LEN;
}

impl TableRecord {
    /// Table identifier.
    pub fn tag(&self) -> Tag {
        self.tag.get()
    }

    /// Offset from the beginning of the font data.
    pub fn offset(&self) -> Offset32 {
        self.offset.get()
    }

    /// Length of the table.
    pub fn length(&self) -> u32 {
        self.length.get()
    }
}

/// Reference to the content of a font file.
///
/// This does not own the underlying data; it resolves table tags to windows
/// into that data.
#[derive(Clone)]
pub struct FontRef<'a> {
    data: FontData<'a>,
    pub table_directory: TableDirectory<'a>,
}

impl<'a> FontRef<'a> {
    /// Creates a new reference to a font.
    pub fn new(data: FontData<'a>) -> Result<Self, ReadError> {
        let table_directory = TableDirectory::read(data)?;
        if [TT_SFNT_VERSION, CFF_SFNT_VERSION, TRUE_SFNT_VERSION]
            .contains(&table_directory.sfnt_version())
        {
            Ok(FontRef {
                data,
                table_directory,
            })
        } else {
            Err(ReadError::InvalidSfnt(table_directory.sfnt_version()))
        }
    }

    /// Returns the data for the table with the specified tag, if present.
    pub fn table_data(&self, tag: Tag) -> Option<FontData<'a>> {
        self.table_directory
            .table_records()
            .binary_search_by(|rec| rec.tag.get().cmp(&tag))
            .ok()
            .and_then(|idx| self.table_directory.table_records().get(idx))
            .and_then(|record| {
                let start = record.offset().non_null()?;
                let len = record.length() as usize;
                self.data.slice(start..start.checked_add(len)?)
            })
    }
}

impl<'a> TableProvider<'a> for FontRef<'a> {
    fn data_for_tag(&self, tag: Tag) -> Option<FontData<'a>> {
        self.table_data(tag)
    }
}
