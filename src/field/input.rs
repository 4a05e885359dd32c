//! Boundary between loaded data and the statistics.
//!
//! Source formats are normalised into a [`FieldInput`] once; the statistics
//! only ever see the resolved [`Field`].
use serde::{Deserialize, Serialize};

use super::cube::Cube;
use super::header::FieldHeader;
use super::map::Map2;
use crate::error::{Result, StatError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldData {
    Map(Map2),
    Cube(Cube),
}

impl FieldData {
    pub fn ndim(&self) -> usize {
        match self {
            FieldData::Map(_) => 2,
            FieldData::Cube(_) => 3,
        }
    }

    /// Shape in storage order.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            FieldData::Map(m) => vec![m.h, m.w],
            FieldData::Cube(c) => c.shape().to_vec(),
        }
    }

    /// Flat row-major values.
    pub fn values(&self) -> &[f64] {
        match self {
            FieldData::Map(m) => &m.data,
            FieldData::Cube(c) => &c.data,
        }
    }
}

#[derive(Clone, Debug)]
pub enum FieldInput {
    WithHeader { data: FieldData, header: FieldHeader },
    NoHeader { data: FieldData },
}

/// Data plus its coordinate descriptor, immutable once handed to a statistic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    data: FieldData,
    header: FieldHeader,
    has_header: bool,
}

impl Field {
    pub fn new(data: FieldData, header: FieldHeader) -> Result<Self> {
        if header.axes.len() != data.ndim() {
            return Err(StatError::invalid(
                "header",
                format!(
                    "{} axes described for {}-dimensional data",
                    header.axes.len(),
                    data.ndim()
                ),
            ));
        }
        Ok(Self {
            data,
            header,
            has_header: true,
        })
    }

    pub fn without_header(data: FieldData) -> Self {
        let header = FieldHeader::for_ndim(data.ndim());
        Self {
            data,
            header,
            has_header: false,
        }
    }

    pub fn from_input(input: FieldInput) -> Result<Self> {
        match input {
            FieldInput::WithHeader { data, header } => Field::new(data, header),
            FieldInput::NoHeader { data } => Ok(Field::without_header(data)),
        }
    }

    pub fn map(map: Map2) -> Self {
        Field::without_header(FieldData::Map(map))
    }

    pub fn cube(cube: Cube) -> Self {
        Field::without_header(FieldData::Cube(cube))
    }

    pub fn data(&self) -> &FieldData {
        &self.data
    }

    pub fn header(&self) -> &FieldHeader {
        &self.header
    }

    pub fn has_header(&self) -> bool {
        self.has_header
    }

    pub fn as_map(&self) -> Option<&Map2> {
        match &self.data {
            FieldData::Map(m) => Some(m),
            FieldData::Cube(_) => None,
        }
    }

    pub fn as_cube(&self) -> Option<&Cube> {
        match &self.data {
            FieldData::Cube(c) => Some(c),
            FieldData::Map(_) => None,
        }
    }

    pub fn into_parts(self) -> (FieldData, FieldHeader) {
        (self.data, self.header)
    }
}

impl TryFrom<FieldInput> for Field {
    type Error = StatError;

    fn try_from(input: FieldInput) -> Result<Self> {
        Field::from_input(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::AxisKind;

    #[test]
    fn no_header_input_infers_cube_axes() {
        let field = Field::from_input(FieldInput::NoHeader {
            data: FieldData::Cube(Cube::new(4, 2, 2)),
        })
        .unwrap();
        assert!(!field.has_header());
        assert_eq!(field.header().axes[0], AxisKind::Spectral);
        assert_eq!(field.header().spatial_axes(), vec![1, 2]);
    }

    #[test]
    fn header_axes_must_match_dimensionality() {
        let res = Field::from_input(FieldInput::WithHeader {
            data: FieldData::Map(Map2::new(2, 2)),
            header: FieldHeader::for_ndim(3),
        });
        assert!(matches!(res, Err(StatError::InvalidParameter { .. })));
    }
}
