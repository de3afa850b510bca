#![no_main]

use libfuzzer_sys::fuzz_target;
use stepjs::lexer::{Lexer, TokenKind};
use stepjs::string_dict::StringDict;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    if source.len() > 100_000 {
        return;
    }

    let mut dict = StringDict::new();
    let mut lexer = Lexer::new(source, &mut dict);
    loop {
        if matches!(lexer.next_token().kind, TokenKind::Eof) {
            break;
        }
    }
});
