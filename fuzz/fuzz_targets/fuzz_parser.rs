#![no_main]

use libfuzzer_sys::fuzz_target;
use stepjs::ast::SourceType;
use stepjs::parser::Parser;
use stepjs::string_dict::StringDict;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    if source.len() > 100_000 {
        return;
    }

    // Both goals: module code is parsed with different rules
    for source_type in [SourceType::Script, SourceType::Module] {
        let mut dict = StringDict::new();
        let _ = Parser::new(source, &mut dict).parse_program(source_type);
    }
});
