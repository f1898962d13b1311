//! Round-trip behavior of the format entry point: parsing pretty-printed
//! output must reproduce it byte for byte.

fn format(source: &str) -> String {
    ember::format(source.as_bytes()).unwrap()
}

fn assert_stable(source: &str) {
    let once = format(source);
    let twice = ember::format(once.as_bytes()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn formatting_is_idempotent_across_constructs() {
    assert_stable(
        r#"
local count = 0
local function step(n)
    count = count + n
    return count
end
while count < 10 do
    step(1)
    if count == 5 then
        break
    end
end
repeat
    step(2)
until count >= 12
for i = 1, 10, 2 do
    step(i)
end
for k, v in pairs({ a = 1, b = 2 }) do
    print(k, v)
end
"#,
    );
}

#[test]
fn method_definitions_and_calls_keep_colon_sugar() {
    let text = format("function Account:deposit(amount)\n    self.balance = self.balance + amount\nend\nAccount:deposit(5)\n");
    assert_eq!(
        text,
        "function Account:deposit(amount)\n    self.balance = self.balance + amount\nend\nAccount:deposit(5)\n"
    );
}

#[test]
fn if_chains_print_as_elseif() {
    let source = "if a then\n    return 1\nelseif b then\n    return 2\nelse\n    return 3\nend\n";
    assert_eq!(format(source), source);
}

#[test]
fn constant_conditions_fold_to_blocks() {
    assert_eq!(format("if true then f() end\n"), "do\n    f()\nend\n");
    assert_eq!(format("if false then f() else g() end\n"), "do\n    g()\nend\n");
}

#[test]
fn tables_wrap_their_entries() {
    let text = format("return {1, 2, x = 3, [\"not a name\"] = 4}\n");
    assert_eq!(
        text,
        "return {\n    1, 2, x = 3, [\"not a name\"] = 4\n}\n"
    );
    assert_stable("return {1, 2, x = 3, [\"not a name\"] = 4}\n");
}

#[test]
fn varargs_functions_round_trip() {
    let source = "local function collect(...)\n    return ...\nend\nreturn collect(1, 2)\n";
    assert_eq!(format(source), source);
}

#[test]
fn string_call_and_table_call_sugar_normalize() {
    assert_eq!(format("require \"module\"\n"), "require(\"module\")\n");
    assert_stable("f({ 1 })\n");
}

#[test]
fn decompiled_output_reparses_identically() {
    // print ∘ parse ∘ print = print, checked on decompiler-shaped text
    for text in [
        "return 42\n",
        "return nil, true\n",
        "local var0 = 5\nlocal function var1()\n    return nil\nend\n",
        "if not a0 then\n    local var0\n    local var1\nend\n",
        "while true do\n    local var1\nend\n",
        "obj:foo()\n",
    ] {
        assert_eq!(format(text), text);
    }
}
