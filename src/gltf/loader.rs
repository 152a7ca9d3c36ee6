//! Buffer resolution and typed accessor reading.
//!
//! The [`LoadContext`] owns the parsed document and the resolved buffer
//! data (GLB blob or embedded base64 data URIs) for the duration of one
//! import. All accessor reads are bounds-checked against the resolved
//! buffers; an overrun is a content error, never a truncated read.

use super::error::ImportError;

/// Parsed document plus resolved buffer bytes.
pub(crate) struct LoadContext {
    pub(crate) document: gltf_dep::Document,
    buffers: Vec<Vec<u8>>,
}

impl LoadContext {
    pub(crate) fn new(document: gltf_dep::Document, buffers: Vec<Vec<u8>>) -> Self {
        Self { document, buffers }
    }

    /// Bounds-checked byte slice and stride for an accessor.
    fn accessor_data(
        &self,
        accessor: &gltf_dep::Accessor,
    ) -> Result<(&[u8], usize), ImportError> {
        let view = accessor.view().ok_or_else(|| {
            ImportError::Accessor(format!(
                "accessor {} has no buffer view (sparse accessors not supported)",
                accessor.index()
            ))
        })?;
        let buffer_index = view.buffer().index();
        let buffer = self.buffers.get(buffer_index).ok_or_else(|| {
            ImportError::Buffer(format!("buffer index {buffer_index} out of range"))
        })?;

        let element_size =
            accessor.data_type().size() * accessor.dimensions().multiplicity();
        let stride = view.stride().unwrap_or(element_size);
        let start = view.offset() + accessor.offset();
        let count = accessor.count();
        let end = if count == 0 {
            start
        } else {
            start + (count - 1) * stride + element_size
        };
        if end > buffer.len() {
            return Err(ImportError::Accessor(format!(
                "accessor {} overruns buffer {buffer_index} ({end} > {} bytes)",
                accessor.index(),
                buffer.len()
            )));
        }
        Ok((&buffer[start..end], stride))
    }

    /// Read an accessor as `N`-component f32 elements.
    ///
    /// Accepts f32 data directly plus normalized u8/u16, which glTF allows
    /// for texture coordinates and weights.
    pub(crate) fn read_f32_elements<const N: usize>(
        &self,
        accessor: &gltf_dep::Accessor,
    ) -> Result<Vec<[f32; N]>, ImportError> {
        use gltf_dep::accessor::DataType;

        self.check_multiplicity(accessor, N)?;
        let (data, stride) = self.accessor_data(accessor)?;
        let count = accessor.count();
        let mut result = Vec::with_capacity(count);

        match (accessor.data_type(), accessor.normalized()) {
            (DataType::F32, _) => {
                for i in 0..count {
                    let mut element = [0.0f32; N];
                    for (c, value) in element.iter_mut().enumerate() {
                        let o = i * stride + c * 4;
                        *value = f32::from_le_bytes([
                            data[o],
                            data[o + 1],
                            data[o + 2],
                            data[o + 3],
                        ]);
                    }
                    result.push(element);
                }
            }
            (DataType::U8, true) => {
                for i in 0..count {
                    let mut element = [0.0f32; N];
                    for (c, value) in element.iter_mut().enumerate() {
                        *value = data[i * stride + c] as f32 / 255.0;
                    }
                    result.push(element);
                }
            }
            (DataType::U16, true) => {
                for i in 0..count {
                    let mut element = [0.0f32; N];
                    for (c, value) in element.iter_mut().enumerate() {
                        let o = i * stride + c * 2;
                        *value = u16::from_le_bytes([data[o], data[o + 1]]) as f32 / 65535.0;
                    }
                    result.push(element);
                }
            }
            (other, _) => {
                return Err(ImportError::Accessor(format!(
                    "accessor {} has unsupported float format {other:?}",
                    accessor.index()
                )));
            }
        }
        Ok(result)
    }

    /// Read a JOINTS-style accessor: 4-component u8 or u16 elements.
    pub(crate) fn read_u16_elements(
        &self,
        accessor: &gltf_dep::Accessor,
    ) -> Result<Vec<[u16; 4]>, ImportError> {
        use gltf_dep::accessor::DataType;

        self.check_multiplicity(accessor, 4)?;
        let (data, stride) = self.accessor_data(accessor)?;
        let count = accessor.count();
        let mut result = Vec::with_capacity(count);

        match accessor.data_type() {
            DataType::U8 => {
                for i in 0..count {
                    let mut element = [0u16; 4];
                    for (c, value) in element.iter_mut().enumerate() {
                        *value = data[i * stride + c] as u16;
                    }
                    result.push(element);
                }
            }
            DataType::U16 => {
                for i in 0..count {
                    let mut element = [0u16; 4];
                    for (c, value) in element.iter_mut().enumerate() {
                        let o = i * stride + c * 2;
                        *value = u16::from_le_bytes([data[o], data[o + 1]]);
                    }
                    result.push(element);
                }
            }
            other => {
                return Err(ImportError::Accessor(format!(
                    "accessor {} has unsupported joint format {other:?}",
                    accessor.index()
                )));
            }
        }
        Ok(result)
    }

    /// Read an index accessor, widening u8/u16 to u32.
    pub(crate) fn read_indices(
        &self,
        accessor: &gltf_dep::Accessor,
    ) -> Result<Vec<u32>, ImportError> {
        use gltf_dep::accessor::DataType;

        self.check_multiplicity(accessor, 1)?;
        let (data, stride) = self.accessor_data(accessor)?;
        let count = accessor.count();
        let mut result = Vec::with_capacity(count);

        match accessor.data_type() {
            DataType::U8 => {
                for i in 0..count {
                    result.push(data[i * stride] as u32);
                }
            }
            DataType::U16 => {
                for i in 0..count {
                    let o = i * stride;
                    result.push(u16::from_le_bytes([data[o], data[o + 1]]) as u32);
                }
            }
            DataType::U32 => {
                for i in 0..count {
                    let o = i * stride;
                    result.push(u32::from_le_bytes([
                        data[o],
                        data[o + 1],
                        data[o + 2],
                        data[o + 3],
                    ]));
                }
            }
            other => {
                return Err(ImportError::Accessor(format!(
                    "accessor {} has unsupported index type {other:?}",
                    accessor.index()
                )));
            }
        }
        Ok(result)
    }

    fn check_multiplicity(
        &self,
        accessor: &gltf_dep::Accessor,
        expected: usize,
    ) -> Result<(), ImportError> {
        let actual = accessor.dimensions().multiplicity();
        if actual != expected {
            return Err(ImportError::Accessor(format!(
                "accessor {} has {actual} components, expected {expected}",
                accessor.index()
            )));
        }
        Ok(())
    }
}

/// Resolve all buffer data for the document.
///
/// Binary glTF carries the first buffer as the embedded blob; JSON glTF
/// embeds buffers as base64 data URIs. External file references are the
/// caller's concern and rejected here.
pub(crate) fn resolve_buffers(
    document: &gltf_dep::Document,
    blob: Option<Vec<u8>>,
) -> Result<Vec<Vec<u8>>, ImportError> {
    let mut buffers = Vec::new();
    for buffer in document.buffers() {
        match buffer.source() {
            gltf_dep::buffer::Source::Bin => {
                let data = blob.as_ref().ok_or_else(|| {
                    ImportError::Buffer("binary buffer referenced but no blob present".into())
                })?;
                buffers.push(data.clone());
            }
            gltf_dep::buffer::Source::Uri(uri) => match parse_data_uri(uri) {
                Some(data) => buffers.push(data),
                None => {
                    return Err(ImportError::Buffer(format!(
                        "external buffer URIs not supported: {uri}"
                    )));
                }
            },
        }
    }
    Ok(buffers)
}

/// Decode a `data:<mime>;base64,<payload>` URI.
fn parse_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (_, payload) = rest.split_once(";base64,")?;
    base64_decode(payload)
}

/// Minimal base64 decoder; padding and whitespace are skipped.
fn base64_decode(input: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() / 4 * 3);
    let mut acc = 0u32;
    let mut bits = 0u32;

    for &byte in input.as_bytes() {
        let value = match byte {
            b'A'..=b'Z' => byte - b'A',
            b'a'..=b'z' => byte - b'a' + 26,
            b'0'..=b'9' => byte - b'0' + 52,
            b'+' => 62,
            b'/' => 63,
            b'=' | b'\n' | b'\r' | b' ' => continue,
            _ => return None,
        };
        acc = (acc << 6) | value as u32;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_roundtrip_text() {
        assert_eq!(
            base64_decode("SGVsbG8gV29ybGQ=").unwrap(),
            b"Hello World"
        );
    }

    #[test]
    fn base64_heavy_padding() {
        assert_eq!(base64_decode("YQ==").unwrap(), b"a");
        assert_eq!(base64_decode("YWI=").unwrap(), b"ab");
        assert_eq!(base64_decode("YWJj").unwrap(), b"abc");
    }

    #[test]
    fn base64_rejects_garbage() {
        assert!(base64_decode("not base64!").is_none());
    }

    #[test]
    fn data_uri_decodes() {
        let uri = "data:application/octet-stream;base64,AQID";
        assert_eq!(parse_data_uri(uri).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn data_uri_rejects_plain_paths() {
        assert!(parse_data_uri("file://some/path").is_none());
        assert!(parse_data_uri("buffer.bin").is_none());
    }
}
