//! 列表字面量编解码
//!
//! 数据集中的列表字段（标签、评论）以 `['a', "b's"]` 的形式存储。

/// 解析列表字面量，任何格式错误都返回 `None`
pub fn parse_list(input: &str) -> Option<Vec<String>> {
    let mut chars = input.trim().chars().peekable();
    if chars.next()? != '[' {
        return None;
    }

    let mut items = Vec::new();
    loop {
        skip_whitespace(&mut chars);
        match chars.peek()? {
            ']' => {
                chars.next();
                break;
            }
            '\'' | '"' => {
                let quote = chars.next()?;
                items.push(parse_quoted(&mut chars, quote)?);
            }
            _ => return None,
        }

        skip_whitespace(&mut chars);
        match chars.next()? {
            ',' => continue,
            ']' => break,
            _ => return None,
        }
    }

    // 右括号之后不允许有其他内容
    if chars.any(|c| !c.is_whitespace()) {
        return None;
    }
    Some(items)
}

/// 解析列表字面量，失败时返回空列表
pub fn parse_list_or_empty(input: &str) -> Vec<String> {
    parse_list(input).unwrap_or_default()
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn parse_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) -> Option<String> {
    let mut out = String::new();
    loop {
        match chars.next()? {
            c if c == quote => return Some(out),
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                '0' => out.push('\0'),
                'x' => out.push(parse_hex(chars, 2)?),
                'u' => out.push(parse_hex(chars, 4)?),
                'U' => out.push(parse_hex(chars, 8)?),
                // 反斜杠、引号以及未知转义原样保留
                '\\' => out.push('\\'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            },
            c => out.push(c),
        }
    }
}

fn parse_hex(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, digits: usize) -> Option<char> {
    let hex: String = (0..digits).map(|_| chars.next()).collect::<Option<String>>()?;
    let code = u32::from_str_radix(&hex, 16).ok()?;
    char::from_u32(code)
}

/// 将字符串列表编码为列表字面量
pub fn format_list<S: AsRef<str>>(items: &[S]) -> String {
    let parts: Vec<String> = items.iter().map(|s| quote(s.as_ref())).collect();
    format!("[{}]", parts.join(", "))
}

fn quote(s: &str) -> String {
    // 含单引号且不含双引号时使用双引号
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
