mod delimiters;
mod parser;

pub use delimiters::{
    CONTRACT_VERSION, EXPLANATION_END, EXPLANATION_START, HTML_END, HTML_START, REACT_END,
    REACT_START,
};
pub use parser::{
    parse_generated_markup, GeneratedResult, EXPLANATION_PLACEHOLDER, HTML_PLACEHOLDER,
    MALFORMED_OUTPUT_MESSAGE, REACT_PLACEHOLDER,
};
