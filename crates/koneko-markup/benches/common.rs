// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
#[allow(dead_code)]
pub fn generate_post(sections: usize) -> String {
    let mut content = String::from(
        "---\nurl-path: bench\nauthor: Bench\ntitle: A *long* post\nlang: en\ntags: bench parsing\n---\n",
    );
    content.push_str("<Abstract>\nA post generated for benchmarking -- nothing more.\n</Abstract>\n\n");

    for section in 0..sections {
        content.push_str(&format!("# Section {section}\n\n"));
        content.push_str(&generate_section_body(section));
        content.push_str(&format!("## Details {section}\n\n"));
        content.push_str(&generate_section_body(section));
    }

    content.push_str("[docs]: https://example.com/docs\n");
    for section in 0..sections {
        content.push_str(&format!("[^sn{section}]: A note with [a link][docs].\n"));
    }
    content
}

#[allow(dead_code)]
fn generate_section_body(n: usize) -> String {
    format!(
        "Some *emphasis*, some **strong** text and `code`... with an &mdash; entity\n\
         and a [reference][docs] plus a sidenote on [this word][^sn{n}].\n\n\
         > Quoted ==highlight== text.\n\
         > -- Someone, *Somewhere*\n\n\
         ```rust https://example.com/src.rs L:1-3\n\
         fn main() {{\n    println!(\"{n}\");\n}}\n\
         ```\n\n\
         ![A picture](img/{n}.png \"alt text\")\n\n\
         ---\n\n"
    )
}
