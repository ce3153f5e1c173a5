//! Row output sinks for streaming repetition.

/// Receives rendered rows from [`Engine::each_into`](crate::Engine::each_into).
///
/// Each pushed chunk already includes the separator when one is due, so
/// concatenating every chunk reproduces the accumulated output of
/// [`Engine::each`](crate::Engine::each) exactly.
pub trait RowSink {
    /// Accepts the next rendered chunk.
    fn push_row(&mut self, row: &str);
}

/// Concatenates chunks in place.
impl RowSink for String {
    fn push_row(&mut self, row: &str) {
        self.push_str(row);
    }
}

/// Collects chunks as separate elements.
impl RowSink for Vec<String> {
    fn push_row(&mut self, row: &str) {
        self.push(row.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_sink_accumulates() {
        let mut out = String::new();
        out.push_row("a");
        out.push_row(",b");
        assert_eq!(out, "a,b");
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut rows: Vec<String> = Vec::new();
        rows.push_row("x");
        rows.push_row(",y");
        assert_eq!(rows, vec!["x", ",y"]);
    }
}
