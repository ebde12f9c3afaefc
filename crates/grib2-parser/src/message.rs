//! Walking GRIB2 messages and their fields.

use bytes::Bytes;
use grid_processor::{rectify, CalibratedGrid, InterpolationMethod};
use tracing::{debug, warn};

use crate::sections::{
    self, bitmap_indicator, DataRepresentation, DataSection, GridDefinition, Identification,
    Indicator, ProductDefinition, INDICATOR_LEN,
};
use crate::unpacking::{unpack_simple, SimplePacking};
use crate::{Grib2Error, Result};

/// One data field of a message: the sections in effect when its data
/// section was read.
#[derive(Debug, Clone)]
pub struct Grib2Field {
    pub grid_definition: GridDefinition,
    pub product_definition: ProductDefinition,
    pub data_representation: DataRepresentation,
    /// Resolved bitmap bytes; `None` when every point is present.
    pub bitmap: Option<Bytes>,
    pub data_section: DataSection,
}

impl Grib2Field {
    /// Grid dimensions `(nx, ny)` after any quasi-regular rectification.
    pub fn grid_dims(&self) -> Result<(usize, usize)> {
        match self.grid_definition.quasi_shape() {
            Some(shape) => Ok(shape?.resolved_dims()),
            None => {
                self.grid_definition.stored_points()?;
                Ok((
                    self.grid_definition.ni as usize,
                    self.grid_definition.nj as usize,
                ))
            }
        }
    }

    /// Point counts per line for a quasi-regular grid.
    pub fn npts_in_line(&self) -> &[u32] {
        &self.grid_definition.npts_in_line
    }

    pub fn scanning_mode(&self) -> u8 {
        self.grid_definition.scanning_mode
    }

    /// Unpack the stored values, in scan order, with bitmap-masked points
    /// set to `missing`.
    ///
    /// A quasi-regular field yields the sum of its line counts; any other
    /// field yields `ni * nj` values.
    pub fn unpack_data(&self, missing: f32) -> Result<Vec<f32>> {
        let repr = &self.data_representation;
        if repr.template != 0 {
            return Err(Grib2Error::UnsupportedTemplate {
                section: 5,
                template: repr.template,
            });
        }
        let packing = SimplePacking {
            reference_value: repr.reference_value,
            binary_scale_factor: repr.binary_scale_factor,
            decimal_scale_factor: repr.decimal_scale_factor,
            bits_per_value: repr.bits_per_value,
        };
        let num_points = self.grid_definition.stored_points()?;
        unpack_simple(
            &self.data_section.data,
            num_points,
            &packing,
            self.bitmap.as_deref(),
            missing,
        )
    }

    /// Unpack and, for quasi-regular fields, stretch every line to the full
    /// grid width.
    pub fn unpack_rectified(
        &self,
        missing: f32,
        method: InterpolationMethod,
    ) -> Result<CalibratedGrid> {
        let values = self.unpack_data(missing)?;
        match self.grid_definition.quasi_shape() {
            Some(shape) => Ok(rectify(&values, &shape?, method)?),
            None => {
                let (nx, ny) = self.grid_dims()?;
                Ok(CalibratedGrid::new(values, nx, ny)?)
            }
        }
    }
}

/// A parsed GRIB2 message holding one or more fields.
#[derive(Debug, Clone)]
pub struct Grib2Message {
    pub indicator: Indicator,
    pub identification: Identification,
    pub fields: Vec<Grib2Field>,
    /// Bytes of the whole message, from "GRIB" through "7777".
    pub raw_data: Bytes,
}

impl Grib2Message {
    /// Parse the message that starts at the beginning of `data`.
    ///
    /// Sections 2 to 7 may repeat; each Section 7 closes one field using the
    /// most recent Sections 3, 4, 5 and 6.
    pub fn parse(data: Bytes) -> Result<Self> {
        let indicator = sections::parse_indicator(&data)?;
        let message_len = usize::try_from(indicator.message_length)
            .ok()
            .filter(|len| *len <= data.len() && *len >= INDICATOR_LEN)
            .ok_or_else(|| {
                Grib2Error::InvalidFormat(format!(
                    "message length {} exceeds available {} bytes",
                    indicator.message_length,
                    data.len()
                ))
            })?;
        let data = data.slice(..message_len);

        let mut identification = None;
        let mut grid = None;
        let mut product = None;
        let mut representation = None;
        let mut bitmap: Option<Option<Bytes>> = None;
        let mut last_bitmap: Option<Bytes> = None;
        let mut fields = Vec::new();

        let mut offset = INDICATOR_LEN;
        while let Some(header) = sections::read_section_header(&data, offset)? {
            let section = data.slice(offset..offset + header.length);
            match header.number {
                1 => identification = Some(sections::parse_identification(&section)?),
                2 => {}
                3 => grid = Some(sections::parse_grid_definition(&section)?),
                4 => product = Some(sections::parse_product_definition(&section)?),
                5 => representation = Some(sections::parse_data_representation(&section)?),
                6 => {
                    let parsed = sections::parse_bitmap(&section)?;
                    bitmap = Some(match parsed.indicator {
                        bitmap_indicator::PRESENT => {
                            last_bitmap = Some(parsed.data.clone());
                            Some(parsed.data)
                        }
                        bitmap_indicator::PREVIOUSLY_DEFINED => {
                            let previous = last_bitmap.clone().ok_or_else(|| {
                                Grib2Error::InvalidSection {
                                    section: 6,
                                    reason: "bitmap reuse requested before any bitmap"
                                        .to_string(),
                                }
                            })?;
                            debug!(offset = offset, "Reusing previously defined bitmap");
                            Some(previous)
                        }
                        bitmap_indicator::NONE => None,
                        other => {
                            warn!(indicator = other, "Predefined bitmap not available");
                            return Err(Grib2Error::InvalidSection {
                                section: 6,
                                reason: format!("unsupported bitmap indicator {}", other),
                            });
                        }
                    });
                }
                7 => {
                    let field = Grib2Field {
                        grid_definition: required(&grid, 3)?,
                        product_definition: required(&product, 4)?,
                        data_representation: required(&representation, 5)?,
                        bitmap: bitmap.clone().flatten(),
                        data_section: sections::parse_data_section(&section)?,
                    };
                    fields.push(field);
                }
                other => {
                    return Err(Grib2Error::InvalidSection {
                        section: other,
                        reason: "unexpected section number".to_string(),
                    })
                }
            }
            offset += header.length;
        }

        let identification = identification.ok_or_else(|| Grib2Error::InvalidSection {
            section: 1,
            reason: "Section not found".to_string(),
        })?;
        if fields.is_empty() {
            return Err(Grib2Error::InvalidFormat("message has no data fields".to_string()));
        }

        Ok(Self {
            indicator,
            identification,
            fields,
            raw_data: data,
        })
    }

    /// Fields in the order their data sections appear.
    pub fn fields(&self) -> &[Grib2Field] {
        &self.fields
    }

    pub fn first_field(&self) -> &Grib2Field {
        // Parsing guarantees at least one field.
        &self.fields[0]
    }

    pub fn grid_dims(&self) -> Result<(usize, usize)> {
        self.first_field().grid_dims()
    }

    /// Unpack the first field; see [`Grib2Field::unpack_data`].
    pub fn unpack_data(&self, missing: f32) -> Result<Vec<f32>> {
        self.first_field().unpack_data(missing)
    }
}

fn required<T: Clone>(section: &Option<T>, number: u8) -> Result<T> {
    section.clone().ok_or_else(|| Grib2Error::InvalidSection {
        section: number,
        reason: "Section not found before data section".to_string(),
    })
}

/// Sequential reader over a buffer holding concatenated GRIB2 messages.
pub struct Grib2Reader {
    data: Bytes,
    offset: usize,
}

impl Grib2Reader {
    pub fn new(data: Bytes) -> Self {
        Self { data, offset: 0 }
    }

    /// Parse the next message, skipping any bytes before the next "GRIB".
    pub fn next_message(&mut self) -> Result<Option<Grib2Message>> {
        let remaining = &self.data[self.offset.min(self.data.len())..];
        let Some(start) = remaining.windows(4).position(|w| w == b"GRIB") else {
            self.offset = self.data.len();
            return Ok(None);
        };
        let start = self.offset + start;
        let message = Grib2Message::parse(self.data.slice(start..))?;
        self.offset = start + message.raw_data.len();
        Ok(Some(message))
    }
}

impl Iterator for Grib2Reader {
    type Item = Result<Grib2Message>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_message() {
            Ok(Some(message)) => Some(Ok(message)),
            Ok(None) => None,
            Err(e) => {
                // Stop after the first malformed message.
                self.offset = self.data.len();
                Some(Err(e))
            }
        }
    }
}
