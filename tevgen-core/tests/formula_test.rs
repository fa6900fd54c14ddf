// Unit tests for emitted combiner formulas, evaluated and checked against the software combiner
use proptest::prelude::*;
use tevgen_core::gx::tev::{AlphaCombiner, ColorCombiner, TevAlphaArg, TevBias, TevColorArg, TevOp, TevRegId, TevScale};
use tevgen_core::reference::{self, LerpForm, StageInputs, TevRegisters};
use tevgen_core::shadergen::combiner::TevCompareOp;
use tevgen_core::{generate_pixel_shader, ApiType, HostConfig, NumericMode, PixelPipelineState, RenderMode, ShaderTarget};

/// Evaluates the statements a combiner writes, one component per lane.
mod interp {
    use std::collections::HashMap;
    use tevgen_core::NumericMode;

    pub type Value = Vec<f64>;
    pub type Env = HashMap<String, Value>;

    #[derive(Debug, Clone, PartialEq)]
    enum Token {
        Num(f64),
        Ident(String),
        Op(&'static str),
    }

    const OPS: [&str; 19] =
        [">>", "<<", ">=", "<=", "==", "+", "-", "*", "/", "(", ")", ",", "?", ":", "<", ">", ".", "=", ";"];

    fn tokenize(src: &str) -> Vec<Token> {
        let bytes = src.as_bytes();
        let mut out = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            let ch = bytes[i];
            if ch.is_ascii_whitespace() {
                i += 1;
            } else if ch.is_ascii_digit() {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                out.push(Token::Num(src[start..i].parse().unwrap()));
            } else if ch.is_ascii_alphabetic() || ch == b'_' {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                out.push(Token::Ident(src[start..i].to_string()));
            } else {
                let op = OPS
                    .iter()
                    .find(|op| src[i..].starts_with(**op))
                    .unwrap_or_else(|| panic!("unexpected {:?} in {src}", ch as char));
                out.push(Token::Op(*op));
                i += op.len();
            }
        }
        out
    }

    fn lane(c: char) -> usize {
        match c {
            'r' | 'x' => 0,
            'g' | 'y' => 1,
            'b' | 'z' => 2,
            'a' | 'w' => 3,
            _ => panic!("bad swizzle {c}"),
        }
    }

    fn zip(a: &Value, b: &Value, f: impl Fn(f64, f64) -> f64) -> Value {
        let n = a.len().max(b.len());
        assert!((a.len() == n || a.len() == 1) && (b.len() == n || b.len() == 1), "{a:?} vs {b:?}");
        let at = |v: &Value, i: usize| if v.len() == 1 { v[0] } else { v[i] };
        (0..n).map(|i| f(at(a, i), at(b, i))).collect()
    }

    fn map(v: Value, f: impl Fn(f64) -> f64) -> Value {
        v.into_iter().map(f).collect()
    }

    fn flag(b: bool) -> f64 {
        if b {
            1.0
        } else {
            0.0
        }
    }

    struct Parser<'a> {
        tokens: Vec<Token>,
        pos: usize,
        env: &'a Env,
        num: NumericMode,
    }

    impl Parser<'_> {
        fn peek_op(&self) -> Option<&'static str> {
            match self.tokens.get(self.pos) {
                Some(Token::Op(op)) => Some(*op),
                _ => None,
            }
        }

        fn eat(&mut self, op: &str) -> bool {
            if self.peek_op() == Some(op) {
                self.pos += 1;
                true
            } else {
                false
            }
        }

        fn expect(&mut self, op: &str) {
            assert!(self.eat(op), "expected {op} at {} in {:?}", self.pos, self.tokens);
        }

        fn ternary(&mut self) -> Value {
            let cond = self.comparison();
            if !self.eat("?") {
                return cond;
            }
            let yes = self.ternary();
            self.expect(":");
            let no = self.ternary();
            if cond[0] != 0.0 {
                yes
            } else {
                no
            }
        }

        fn comparison(&mut self) -> Value {
            let mut lhs = self.shift();
            while let Some(op @ (">=" | "<=" | "==" | "<" | ">")) = self.peek_op() {
                self.pos += 1;
                let rhs = self.shift();
                lhs = zip(&lhs, &rhs, |a, b| {
                    flag(match op {
                        ">=" => a >= b,
                        "<=" => a <= b,
                        "==" => a == b,
                        "<" => a < b,
                        _ => a > b,
                    })
                });
            }
            lhs
        }

        fn shift(&mut self) -> Value {
            let mut lhs = self.additive();
            while let Some(op @ (">>" | "<<")) = self.peek_op() {
                self.pos += 1;
                let rhs = self.additive();
                lhs = zip(&lhs, &rhs, |a, b| {
                    let p = f64::powi(2.0, b as i32);
                    if op == ">>" {
                        (a / p).floor()
                    } else {
                        a * p
                    }
                });
            }
            lhs
        }

        fn additive(&mut self) -> Value {
            let mut lhs = self.multiplicative();
            while let Some(op @ ("+" | "-")) = self.peek_op() {
                self.pos += 1;
                let rhs = self.multiplicative();
                lhs = zip(&lhs, &rhs, |a, b| if op == "+" { a + b } else { a - b });
            }
            lhs
        }

        fn multiplicative(&mut self) -> Value {
            let mut lhs = self.unary();
            while let Some(op @ ("*" | "/")) = self.peek_op() {
                self.pos += 1;
                let rhs = self.unary();
                lhs = zip(&lhs, &rhs, |a, b| if op == "*" { a * b } else { a / b });
            }
            lhs
        }

        fn unary(&mut self) -> Value {
            if self.eat("-") {
                return map(self.unary(), |x| -x);
            }
            let mut value = self.primary();
            while self.eat(".") {
                match self.tokens.get(self.pos).cloned() {
                    Some(Token::Ident(swizzle)) => {
                        self.pos += 1;
                        value = swizzle.chars().map(|c| value[lane(c)]).collect();
                    }
                    other => panic!("expected swizzle, got {other:?}"),
                }
            }
            value
        }

        fn primary(&mut self) -> Value {
            let token = self.tokens.get(self.pos).cloned();
            self.pos += 1;
            match token {
                Some(Token::Num(n)) => vec![n],
                Some(Token::Op("(")) => {
                    let v = self.ternary();
                    self.expect(")");
                    v
                }
                Some(Token::Ident(name)) if self.eat("(") => {
                    let mut args = Vec::new();
                    if !self.eat(")") {
                        loop {
                            args.push(self.ternary());
                            if self.eat(")") {
                                break;
                            }
                            self.expect(",");
                        }
                    }
                    self.call(&name, args)
                }
                Some(Token::Ident(name)) => {
                    self.env.get(&name).cloned().unwrap_or_else(|| panic!("unbound {name}"))
                }
                other => panic!("unexpected token {other:?}"),
            }
        }

        fn call(&self, name: &str, mut args: Vec<Value>) -> Value {
            // Constructors flatten their arguments.
            if name.starts_with("float") || name.starts_with("int") {
                return args.concat();
            }
            let mut arg = |i: usize| std::mem::take(&mut args[i]);
            match name {
                "trunc" => map(arg(0), f64::trunc),
                "floor" => map(arg(0), f64::floor),
                "round" => map(arg(0), f64::round),
                "abs" => map(arg(0), f64::abs),
                "frac" => map(arg(0), |x| x - x.floor()),
                "sign" => map(arg(0), |x| flag(x > 0.0) - flag(x < 0.0)),
                "max" => {
                    let (a, b) = (arg(0), arg(1));
                    zip(&a, &b, f64::max)
                }
                "clamp" => {
                    let (x, lo, hi) = (arg(0), arg(1), arg(2));
                    zip(&zip(&x, &lo, f64::max), &hi, f64::min)
                }
                "dot" => {
                    let (a, b) = (arg(0), arg(1));
                    vec![zip(&a, &b, |x, y| x * y).iter().sum()]
                }
                "CHK_O_U8" => match self.num {
                    NumericMode::Float => map(arg(0), |x| {
                        let t = (x + 1024.0) * (1.0 / 256.0);
                        (t - t.floor()) * 256.0
                    }),
                    NumericMode::Integer => map(arg(0), |x| ((x as i64) & 255) as f64),
                },
                _ => panic!("unknown function {name}"),
            }
        }
    }

    pub fn eval(src: &str, env: &Env, num: NumericMode) -> Value {
        let mut parser = Parser { tokens: tokenize(src), pos: 0, env, num };
        let value = parser.ternary();
        assert_eq!(parser.pos, parser.tokens.len(), "trailing tokens in {src}");
        value
    }

    /// Runs `name[.swizzle] = expr;` lines, skipping comments.
    pub fn run(block: &str, env: &mut Env, num: NumericMode) {
        for line in block.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with("//")) {
            let stmt = line.strip_suffix(';').unwrap_or_else(|| panic!("not a statement: {line}"));
            let (lhs, rhs) = stmt.split_once(" = ").unwrap_or_else(|| panic!("not an assignment: {line}"));
            let value = eval(rhs, env, num);
            match lhs.split_once('.') {
                Some((name, swizzle)) => {
                    let target = env.get_mut(name).unwrap_or_else(|| panic!("unbound {name}"));
                    for (i, c) in swizzle.chars().enumerate() {
                        target[lane(c)] = if value.len() == 1 { value[0] } else { value[i] };
                    }
                }
                None => {
                    env.insert(lhs.to_string(), value);
                }
            }
        }
    }
}

const REGISTERS: [&str; 4] = ["prev", "c0", "c1", "c2"];

/// Generates one stage and returns the operand setup plus both combine lines.
fn stage_text(color: ColorCombiner, alpha: AlphaCombiner, num: NumericMode) -> String {
    let mut state = PixelPipelineState::default();
    state.stages[0].color = color;
    state.stages[0].alpha = alpha;
    let target = ShaderTarget::new(ApiType::Vulkan, num).unwrap();
    let code = generate_pixel_shader(&state, &HostConfig::default(), target, RenderMode::Default)
        .unwrap()
        .code
        .unwrap();
    let start = code.find("\ntin_a = ").expect("operand setup") + 1;
    let marker = "// alpha combine\n";
    let alpha_line = start + code[start..].find(marker).expect("alpha combine") + marker.len();
    let end = alpha_line + code[alpha_line..].find('\n').expect("alpha output") + 1;
    code[start..end].to_string()
}

/// Runs the generated statements over `regs` and returns the registers.
fn evaluate(text: &str, regs: &TevRegisters, num: NumericMode) -> [[i32; 4]; 4] {
    let inputs = StageInputs::default();
    let mut env = interp::Env::new();
    for (name, value) in REGISTERS.iter().zip(regs.0) {
        env.insert(name.to_string(), value.map(f64::from).to_vec());
    }
    env.insert("tex_t".into(), inputs.tex.map(f64::from).to_vec());
    env.insert("konst_t".into(), inputs.konst.map(f64::from).to_vec());
    env.insert("c16".into(), vec![1.0, 256.0, 0.0]);
    env.insert("c24".into(), vec![1.0, 256.0, 65536.0]);
    interp::run(text, &mut env, num);

    let mut out = [[0; 4]; 4];
    for (reg, name) in out.iter_mut().zip(REGISTERS) {
        for (dst, v) in reg.iter_mut().zip(&env[name]) {
            assert_eq!(v.fract(), 0.0, "{name} holds {v}");
            *dst = *v as i32;
        }
    }
    out
}

fn line_after<'a>(text: &'a str, marker: &str) -> &'a str {
    let start = text.find(marker).unwrap() + marker.len();
    text[start..].lines().next().unwrap()
}

fn lerp_fragment(form: LerpForm, comp: &str, scale: TevScale, num: NumericMode) -> String {
    let (left, k) = match num {
        NumericMode::Float => (["", " * 2.0", " * 4.0", ""][scale as usize], "256.0"),
        NumericMode::Integer => (["", " * 2", " * 4", ""][scale as usize], "256"),
    };
    match form {
        LerpForm::PassA => format!("(tin_a{comp}{left})"),
        LerpForm::PassB => format!("(tin_b{comp}{left})"),
        LerpForm::ScaleB => format!("((tin_b{comp}*tin_c{comp}){left})"),
        LerpForm::ScaleA => format!("((tin_a{comp}*({k} - tin_c{comp})){left})"),
        LerpForm::Full => format!("((tin_a{comp}*{k} + (tin_b{comp}-tin_a{comp})*tin_c{comp}){left})"),
    }
}

fn compare_fragment(op: TevCompareOp, num: NumericMode) -> &'static str {
    match (op, num) {
        (TevCompareOp::R8Gt | TevCompareOp::R8Eq, _) => "tin_a.r ",
        (TevCompareOp::Gr16Gt | TevCompareOp::Gr16Eq, NumericMode::Float) => "dot(tin_a.rgb, c16)",
        (TevCompareOp::Gr16Gt | TevCompareOp::Gr16Eq, NumericMode::Integer) => "(tin_a.r + (tin_a.g << 8))",
        (TevCompareOp::Bgr24Gt | TevCompareOp::Bgr24Eq, NumericMode::Float) => "dot(tin_a.rgb, c24)",
        (TevCompareOp::Bgr24Gt | TevCompareOp::Bgr24Eq, NumericMode::Integer) => "(tin_a.b << 16)",
        (TevCompareOp::Rgb8Gt | TevCompareOp::Rgb8Eq, _) => "sign(",
        (TevCompareOp::A8Gt | TevCompareOp::A8Eq, _) => "tin_a.a",
    }
}

/// Checks both halves' formula shape, then the evaluated registers.
fn check_stage(color: ColorCombiner, alpha: AlphaCombiner, regs: TevRegisters, num: NumericMode) -> Result<(), String> {
    let text = stage_text(color, alpha, num);
    let color_line = line_after(&text, "// color combine\n");
    let alpha_line = line_after(&text, "// alpha combine\n");

    let halves = [
        (color_line, ".rgb", color.bias, color.scale, TevCompareOp::for_color(color.scale, color.op), LerpForm::for_color(&color)),
        (alpha_line, ".a", alpha.bias, alpha.scale, TevCompareOp::for_alpha(alpha.scale, alpha.op), LerpForm::for_alpha(&alpha)),
    ];
    for (line, comp, bias, scale, compare, form) in halves {
        if bias == TevBias::Compare {
            if !line.contains(compare_fragment(compare, num)) {
                return Err(format!("{compare:?} not emitted: {line}"));
            }
        } else {
            let want = lerp_fragment(form, comp, scale, num);
            if !line.contains(&want) {
                return Err(format!("{form:?} expects {want}: {line}"));
            }
            for other in LerpForm::ALL.into_iter().filter(|f| *f != form) {
                if line.contains(&lerp_fragment(other, comp, scale, num)) {
                    return Err(format!("{other:?} emitted where {form:?} applies: {line}"));
                }
            }
        }
    }

    let mut expected = regs;
    reference::run_stage(&mut expected, &color, &alpha, &StageInputs::default());
    let got = evaluate(&text, &regs, num);
    if got != expected.0 {
        return Err(format!("{num}: shader {got:?}, software {:?}\n{text}", expected.0));
    }
    Ok(())
}

// Ras inputs are left out; they need a bound vertex color.
const COLOR_ARGS: [TevColorArg; 14] = [
    TevColorArg::Cprev,
    TevColorArg::Aprev,
    TevColorArg::C0,
    TevColorArg::A0,
    TevColorArg::C1,
    TevColorArg::A1,
    TevColorArg::C2,
    TevColorArg::A2,
    TevColorArg::TexC,
    TevColorArg::TexA,
    TevColorArg::One,
    TevColorArg::Half,
    TevColorArg::Konst,
    TevColorArg::Zero,
];

const ALPHA_ARGS: [TevAlphaArg; 7] = [
    TevAlphaArg::Aprev,
    TevAlphaArg::A0,
    TevAlphaArg::A1,
    TevAlphaArg::A2,
    TevAlphaArg::TexA,
    TevAlphaArg::Konst,
    TevAlphaArg::Zero,
];

fn arb_settings() -> impl Strategy<Value = (TevBias, TevOp, TevScale, bool, TevRegId)> {
    (0u8..4, any::<bool>(), 0u8..4, any::<bool>(), 0u8..4).prop_map(|(bias, sub, scale, clamp, dest)| {
        (TevBias::from_raw(bias), TevOp::from_raw(sub as u8), TevScale::from_raw(scale), clamp, TevRegId::from_raw(dest))
    })
}

fn arb_color() -> impl Strategy<Value = ColorCombiner> {
    (prop::array::uniform4(prop::sample::select(COLOR_ARGS.to_vec())), arb_settings()).prop_map(
        |([a, b, c, d], (bias, op, scale, clamp, dest))| ColorCombiner { a, b, c, d, bias, op, clamp, scale, dest },
    )
}

fn arb_alpha() -> impl Strategy<Value = AlphaCombiner> {
    (prop::array::uniform4(prop::sample::select(ALPHA_ARGS.to_vec())), arb_settings()).prop_map(
        |([a, b, c, d], (bias, op, scale, clamp, dest))| AlphaCombiner {
            a,
            b,
            c,
            d,
            bias,
            op,
            clamp,
            scale,
            dest,
            ..Default::default()
        },
    )
}

/// Register contents, including values an unclamped stage can leave behind.
fn arb_registers() -> impl Strategy<Value = TevRegisters> {
    let component = prop_oneof![Just(0), Just(128), Just(255), 0i32..=255, -1024i32..=1023];
    prop::array::uniform4(prop::array::uniform4(component)).prop_map(TevRegisters)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1024))]

    #[test]
    fn test_emitted_stage_matches_software_combiner(
        color in arb_color(),
        alpha in arb_alpha(),
        regs in arb_registers(),
        integer in any::<bool>(),
    ) {
        let num = if integer { NumericMode::Integer } else { NumericMode::Float };
        if let Err(msg) = check_stage(color, alpha, regs, num) {
            prop_assert!(false, "{}", msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [NumericMode; 2] = [NumericMode::Float, NumericMode::Integer];
    const SCALES: [TevScale; 4] = [TevScale::Scale1, TevScale::Scale2, TevScale::Scale4, TevScale::DivideBy2];

    fn registers() -> [TevRegisters; 3] {
        [
            TevRegisters([[10, 20, 30, 40], [200, 100, 50, 128], [128, 128, 128, 255], [-300, 700, 1023, -1024]]),
            TevRegisters([[0; 4], [255; 4], [77, 77, 77, 77], [77, 78, 76, 77]]),
            TevRegisters([[-5, -3, -1, -7], [1, 2, 3, 4], [1, 2, 3, 4], [255, 0, 255, 0]]),
        ]
    }

    fn color_with(a: TevColorArg, b: TevColorArg, c: TevColorArg) -> ColorCombiner {
        ColorCombiner { a, b, c, d: TevColorArg::Cprev, ..Default::default() }
    }

    #[test]
    fn test_every_lerp_form_in_every_setting() {
        let forms = [
            (color_with(TevColorArg::C1, TevColorArg::C1, TevColorArg::C0), LerpForm::PassA),
            (color_with(TevColorArg::C1, TevColorArg::C2, TevColorArg::Zero), LerpForm::PassA),
            (color_with(TevColorArg::C1, TevColorArg::C2, TevColorArg::One), LerpForm::PassB),
            (color_with(TevColorArg::Zero, TevColorArg::C2, TevColorArg::C0), LerpForm::ScaleB),
            (color_with(TevColorArg::C1, TevColorArg::Zero, TevColorArg::C0), LerpForm::ScaleA),
            (color_with(TevColorArg::C1, TevColorArg::C2, TevColorArg::C0), LerpForm::Full),
        ];
        for (base, form) in forms {
            assert_eq!(LerpForm::for_color(&base), form);
            for bias in [TevBias::Zero, TevBias::AddHalf, TevBias::SubHalf] {
                for op in [TevOp::Add, TevOp::Sub] {
                    for scale in SCALES {
                        for clamp in [true, false] {
                            let color = ColorCombiner { bias, op, scale, clamp, ..base };
                            let alpha = AlphaCombiner {
                                a: TevAlphaArg::A1,
                                b: TevAlphaArg::A2,
                                c: TevAlphaArg::A0,
                                d: TevAlphaArg::Aprev,
                                bias,
                                op,
                                scale,
                                clamp,
                                ..Default::default()
                            };
                            for regs in registers() {
                                for num in MODES {
                                    check_stage(color, alpha, regs, num).unwrap();
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_every_compare_op() {
        for scale in SCALES {
            for op in [TevOp::Add, TevOp::Sub] {
                for clamp in [true, false] {
                    let color = ColorCombiner {
                        a: TevColorArg::C0,
                        b: TevColorArg::C1,
                        c: TevColorArg::C2,
                        d: TevColorArg::Cprev,
                        bias: TevBias::Compare,
                        op,
                        scale,
                        clamp,
                        dest: TevRegId::Reg2,
                    };
                    let alpha = AlphaCombiner {
                        a: TevAlphaArg::A0,
                        b: TevAlphaArg::A1,
                        c: TevAlphaArg::A2,
                        d: TevAlphaArg::Aprev,
                        bias: TevBias::Compare,
                        op,
                        scale,
                        clamp,
                        dest: TevRegId::Reg2,
                        ..Default::default()
                    };
                    for regs in registers() {
                        for num in MODES {
                            check_stage(color, alpha, regs, num).unwrap();
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_halving_floors_negative_results() {
        // (0 - 3) / 2 rounds down to -2 in both numeric modes.
        let color = ColorCombiner {
            a: TevColorArg::Zero,
            b: TevColorArg::Zero,
            c: TevColorArg::Zero,
            d: TevColorArg::C0,
            scale: TevScale::DivideBy2,
            clamp: false,
            ..Default::default()
        };
        let regs = TevRegisters([[0; 4], [-3, -1, 3, 0], [0; 4], [0; 4]]);
        for num in MODES {
            let text = stage_text(color, AlphaCombiner::default(), num);
            assert_eq!(&evaluate(&text, &regs, num)[0][..3], &[-2, -1, 1], "{num}");
        }
        check_stage(color, AlphaCombiner::default(), regs, NumericMode::Float).unwrap();
    }

    #[test]
    fn test_interpreter_follows_c_precedence() {
        let env = interp::Env::new();
        assert_eq!(interp::eval("1 + 2 << 3", &env, NumericMode::Integer), vec![24.0]);
        assert_eq!(interp::eval("(0 > 1) ? 5 : 1 + 1", &env, NumericMode::Integer), vec![2.0]);
        assert_eq!(interp::eval("-7 >> 1", &env, NumericMode::Integer), vec![-4.0]);
        assert_eq!(interp::eval("max(sign(float3(-2.0,0.0,3.0)), 0.0)", &env, NumericMode::Float), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_registers_map_to_destinations() {
        assert_eq!(REGISTERS[TevRegId::Prev as usize], "prev");
        assert_eq!(REGISTERS[TevRegId::Reg1 as usize], "c1");
    }
}
