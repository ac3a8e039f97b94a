use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use std::fmt;

/// Character offsets into the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }

    pub fn to(&self, other: &Span) -> Span {
        Span::new(self.start, other.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LexError,
    SyntaxError,
    NameError,
    ArityError,
    TypeError,
    ScopeError,
    ArithmeticError,
    IoError,
}

impl ErrorKind {
    fn color(self) -> Color {
        match self {
            ErrorKind::LexError => Color::Red,
            ErrorKind::SyntaxError => Color::Yellow,
            ErrorKind::NameError => Color::Blue,
            ErrorKind::ArityError => Color::Cyan,
            ErrorKind::TypeError | ErrorKind::ArithmeticError => Color::Magenta,
            ErrorKind::ScopeError => Color::Green,
            ErrorKind::IoError => Color::Red,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::LexError => "Lexical Error",
            ErrorKind::SyntaxError => "Syntax Error",
            ErrorKind::NameError => "Name Error",
            ErrorKind::ArityError => "Arity Error",
            ErrorKind::TypeError => "Type Error",
            ErrorKind::ScopeError => "Scope Error",
            ErrorKind::ArithmeticError => "Arithmetic Error",
            ErrorKind::IoError => "I/O Error",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct MintError {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
}

impl MintError {
    pub fn new(kind: ErrorKind, span: Span, message: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn lex_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::LexError, span, message)
    }

    pub fn syntax_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::SyntaxError, span, message)
    }

    pub fn name_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::NameError, span, message)
    }

    pub fn arity_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::ArityError, span, message)
    }

    pub fn type_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::TypeError, span, message)
    }

    pub fn scope_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::ScopeError, span, message)
    }

    pub fn arithmetic_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::ArithmeticError, span, message)
    }

    pub fn io_error(span: Span, error: std::io::Error) -> Self {
        Self::new(ErrorKind::IoError, span, format!("Failed to write output: {}", error))
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        let filename = filename.unwrap_or("<script>");
        let color = self.kind.color();

        let mut report_builder = Report::build(ReportKind::Error, filename, self.span.start)
            .with_message(format!("{}: {}", self.kind.fg(color), self.message))
            .with_label(
                Label::new((filename, self.span.start..self.span.end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        if let Some(ref help_text) = self.help {
            report_builder = report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        // The terminal may already be gone; fall back to a plain line.
        if report_builder
            .finish()
            .eprint((filename, Source::from(source)))
            .is_err()
        {
            eprintln!("{}: {}", self.kind, self.message);
        }
    }
}

impl fmt::Display for MintError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for MintError {}
