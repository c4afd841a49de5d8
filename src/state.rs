/// Position of the parser inside the multipart message.
///
/// `pos` counts the boundary key bytes matched so far; it survives across
/// `write` calls so a delimiter split over several chunks is still found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    /// Before the first boundary. Bytes here are discarded.
    Preamble,
    /// Tentatively matching the delimiter found in the preamble.
    PreambleBoundary { pos: usize },
    /// Tentatively matching the delimiter inside a part body. The matched
    /// bytes are replayed into the body if the match fails.
    MatchingBoundary { pos: usize },
    /// The whole key matched; expecting CRLF or `--`.
    BoundaryEnd,
    BoundaryCr,
    BoundaryDash,
    HeaderLineStart,
    HeaderName,
    HeaderValueStart,
    HeaderValue,
    HeaderValueCr,
    HeaderBlockCr,
    Body,
    /// After `--boundary--`. Only a single CRLF may follow.
    Epilogue,
    EpilogueCr,
    EpilogueDone,
    /// Parsing stopped: an error was emitted or the instance was destroyed.
    Failed,
}

impl Stage {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            Stage::Preamble | Stage::PreambleBoundary { .. } => "preamble",
            Stage::MatchingBoundary { .. } | Stage::BoundaryEnd | Stage::BoundaryCr | Stage::BoundaryDash => {
                "boundary"
            }
            Stage::HeaderLineStart | Stage::HeaderBlockCr => "header block",
            Stage::HeaderName => "header name",
            Stage::HeaderValueStart | Stage::HeaderValue | Stage::HeaderValueCr => "header value",
            Stage::Body => "part body",
            Stage::Epilogue | Stage::EpilogueCr | Stage::EpilogueDone => "epilogue",
            Stage::Failed => "failed stream",
        }
    }

    pub(crate) fn in_epilogue(self) -> bool {
        matches!(self, Stage::Epilogue | Stage::EpilogueCr | Stage::EpilogueDone)
    }
}
