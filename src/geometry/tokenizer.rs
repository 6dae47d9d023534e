//! 文本分词器
//!
//! 在内存中的文本缓冲区上按需产生记号，只能向前推进，不可回退重启。
//! 除空白外还可以指定一组分隔符（OBJ 面记录中的 `/`）。
//!
//! 数值读取（浮点数组、整数）不会跨越换行，这样一条记录读到行尾
//! 就自然停止；`read_token` 则会跳过换行，用于读取每行的指令。

/// 惰性分词器
pub struct Tokenizer<'a> {
    data: &'a [u8],
    pos: usize,
    delimiters: &'a [u8],
    consume_ws: bool,
    line: usize,
    token: &'a [u8],
}

impl<'a> Tokenizer<'a> {
    /// 创建分词器
    ///
    /// # 参数
    ///
    /// - `data`: 文本数据（不要求是合法 UTF-8）
    /// - `delimiters`: 空白之外的分隔符集合
    pub fn new(data: &'a [u8], delimiters: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            delimiters,
            consume_ws: true,
            line: 1,
            token: &[],
        }
    }

    /// 是否已经到达输入末尾
    #[inline]
    pub fn at_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// 当前行号（从 1 开始）
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// 最近一次 `read_token` 捕获的记号
    #[inline]
    pub fn last_token(&self) -> &'a [u8] {
        self.token
    }

    /// 设置数值读取前是否跳过行内空白
    pub fn set_consume_ws(&mut self, consume: bool) {
        self.consume_ws = consume;
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    #[inline]
    fn is_delim(&self, c: u8) -> bool {
        self.delimiters.contains(&c)
    }

    #[inline]
    fn is_inline_ws(c: u8) -> bool {
        c == b' ' || c == b'\t' || c == b'\r'
    }

    fn skip_inline_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !Self::is_inline_ws(c) {
                break;
            }
            self.pos += 1;
        }
    }

    fn scan_token_end(&self, start: usize) -> usize {
        let mut end = start;
        while end < self.data.len() {
            let c = self.data[end];
            if c.is_ascii_whitespace() || self.is_delim(c) {
                break;
            }
            end += 1;
        }
        end
    }

    /// 读取下一个记号
    ///
    /// 跳过空白、换行和分隔符后捕获记号；输入耗尽时返回 `false`。
    pub fn read_token(&mut self) -> bool {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() || self.is_delim(c) {
                if c == b'\n' {
                    self.line += 1;
                }
                self.pos += 1;
            } else {
                break;
            }
        }

        if self.at_eof() {
            self.token = &[];
            return false;
        }

        let start = self.pos;
        self.pos = self.scan_token_end(start);
        self.token = &self.data[start..self.pos];
        true
    }

    /// 丢弃直到下一个换行符（含）的所有字符
    pub fn consume_to_eol(&mut self) {
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == b'\n' {
                self.line += 1;
                break;
            }
        }
    }

    /// 当前行剩余部分是否只有空白或注释
    pub fn rest_of_line_is_empty(&mut self) -> bool {
        self.skip_inline_ws();
        matches!(self.peek(), None | Some(b'\n') | Some(b'#'))
    }

    /// 消耗一个分隔符（不跳过空白）
    ///
    /// 下一个字符是分隔符时消耗它并返回 `true`。
    pub fn consume_one_delim(&mut self) -> bool {
        match self.peek() {
            Some(c) if self.is_delim(c) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    /// 下一个字符是否是分隔符
    pub fn at_delim(&self) -> bool {
        self.peek().map_or(false, |c| self.is_delim(c))
    }

    /// 把当前行上的连续记号解析为浮点数
    ///
    /// 最多读取 `max_count` 个且不超过 `out.len()`；遇到无法解析的记号时停止，
    /// 该记号不会被消耗，便于调用方回退处理。返回成功读取的个数。
    pub fn get_token_float_array(&mut self, out: &mut [f32], max_count: usize) -> usize {
        let limit = max_count.min(out.len());
        let mut count = 0;

        while count < limit {
            let saved = self.pos;
            self.skip_inline_ws();
            let start = self.pos;
            let end = self.scan_token_end(start);
            let parsed = std::str::from_utf8(&self.data[start..end])
                .ok()
                .filter(|s| !s.is_empty())
                .and_then(|s| s.parse::<f32>().ok());

            match parsed {
                Some(value) => {
                    out[count] = value;
                    count += 1;
                    self.pos = end;
                }
                None => {
                    self.pos = saved;
                    break;
                }
            }
        }

        count
    }

    /// 当前行上的下一个非数值记号（用于报错），不消耗
    pub fn peek_token(&mut self) -> String {
        let saved = self.pos;
        self.skip_inline_ws();
        let end = self.scan_token_end(self.pos);
        let token = String::from_utf8_lossy(&self.data[self.pos..end]).into_owned();
        self.pos = saved;
        token
    }

    /// 解析一个整数
    ///
    /// 允许前导符号。记号后面必须紧跟空白、分隔符或输入末尾，
    /// 否则视为失败且不消耗任何字符。
    pub fn get_token_int(&mut self) -> Option<i64> {
        let saved = self.pos;
        if self.consume_ws {
            self.skip_inline_ws();
        }

        let start = self.pos;
        let mut end = start;
        if matches!(self.data.get(end), Some(b'-') | Some(b'+')) {
            end += 1;
        }
        let digits_start = end;
        while end < self.data.len() && self.data[end].is_ascii_digit() {
            end += 1;
        }

        let terminated = end == self.data.len()
            || self.data[end].is_ascii_whitespace()
            || self.is_delim(self.data[end]);

        if end == digits_start || !terminated {
            self.pos = saved;
            return None;
        }

        let value = std::str::from_utf8(&self.data[start..end])
            .ok()
            .and_then(|s| s.parse::<i64>().ok());

        match value {
            Some(v) => {
                self.pos = end;
                Some(v)
            }
            None => {
                self.pos = saved;
                None
            }
        }
    }

    /// 连续解析最多 `out.len()` 个由单个分隔符连接的整数
    ///
    /// 第一个整数之前允许空白，之后每个整数之前必须恰好有一个分隔符。
    /// 分隔符后面没有整数时该分隔符不会被消耗。返回成功读取的个数。
    pub fn get_token_int_array(&mut self, out: &mut [i64]) -> usize {
        let mut count = 0;
        while count < out.len() {
            let saved = self.pos;
            if count > 0 {
                if !self.consume_one_delim() {
                    break;
                }
                self.set_consume_ws(false);
            }
            let value = self.get_token_int();
            self.set_consume_ws(true);
            match value {
                Some(v) => {
                    out[count] = v;
                    count += 1;
                }
                None => {
                    self.pos = saved;
                    break;
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_tokens_across_lines() {
        let mut tok = Tokenizer::new(b"v 1 2\n  vn\tx", b"/");
        assert!(tok.read_token());
        assert_eq!(tok.last_token(), b"v");
        tok.consume_to_eol();
        assert!(tok.read_token());
        assert_eq!(tok.last_token(), b"vn");
        assert_eq!(tok.line(), 2);
        assert!(tok.read_token());
        assert_eq!(tok.last_token(), b"x");
        assert!(!tok.read_token());
        assert!(tok.at_eof());
    }

    #[test]
    fn test_float_array_stops_at_bad_token() {
        let mut tok = Tokenizer::new(b" 1.5 -2 3e1 abc", b"/");
        let mut out = [0.0; 4];
        let count = tok.get_token_float_array(&mut out, 4);
        assert_eq!(count, 3);
        assert_eq!(&out[..3], &[1.5, -2.0, 30.0]);
        // 失败的记号没有被消耗
        assert_eq!(tok.peek_token(), "abc");
    }

    #[test]
    fn test_float_array_does_not_cross_newline() {
        let mut tok = Tokenizer::new(b" 1 2 3\n4", b"/");
        let mut out = [0.0; 4];
        assert_eq!(tok.get_token_float_array(&mut out, 4), 3);
    }

    #[test]
    fn test_float_array_respects_max_count() {
        let mut tok = Tokenizer::new(b" 1 2 3 4", b"/");
        let mut out = [0.0; 4];
        assert_eq!(tok.get_token_float_array(&mut out, 2), 2);
        assert_eq!(tok.peek_token(), "3");
    }

    #[test]
    fn test_int_with_delimiters() {
        let mut tok = Tokenizer::new(b" 1/2/3 4//5", b"/");
        let mut idx = [0i64; 3];
        assert_eq!(tok.get_token_int_array(&mut idx), 3);
        assert_eq!(idx, [1, 2, 3]);

        assert_eq!(tok.get_token_int(), Some(4));
        assert!(tok.consume_one_delim());
        assert!(tok.consume_one_delim());
        assert_eq!(tok.get_token_int(), Some(5));
        assert!(tok.rest_of_line_is_empty());
    }

    #[test]
    fn test_int_array_leaves_dangling_delimiter() {
        let mut tok = Tokenizer::new(b"7//9", b"/");
        let mut idx = [0i64; 3];
        assert_eq!(tok.get_token_int_array(&mut idx), 1);
        assert_eq!(idx[0], 7);
        assert!(tok.at_delim());
        assert!(tok.consume_one_delim());
        assert!(tok.consume_one_delim());
        assert_eq!(tok.get_token_int(), Some(9));
    }

    #[test]
    fn test_int_rejects_trailing_garbage() {
        let mut tok = Tokenizer::new(b" 12a", b"/");
        assert_eq!(tok.get_token_int(), None);
        assert_eq!(tok.peek_token(), "12a");
    }

    #[test]
    fn test_negative_int() {
        let mut tok = Tokenizer::new(b" -3 +4", b"/");
        assert_eq!(tok.get_token_int(), Some(-3));
        assert_eq!(tok.get_token_int(), Some(4));
        assert_eq!(tok.get_token_int(), None);
    }

    #[test]
    fn test_consume_ws_disabled() {
        let mut tok = Tokenizer::new(b"/ 3", b"/");
        assert!(tok.consume_one_delim());
        tok.set_consume_ws(false);
        assert_eq!(tok.get_token_int(), None);
        tok.set_consume_ws(true);
        assert_eq!(tok.get_token_int(), Some(3));
    }
}
