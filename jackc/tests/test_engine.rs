use jackc::{compile_str, CompileError};

const POINT: &str = include_str!("point.jack");
const COUNTER: &str = include_str!("counter.jack");
const MAIN: &str = include_str!("main.jack");

#[test]
fn test_compile_constructor_and_method() {
    let vm = compile_str(POINT).expect("compile error");

    // The constructor allocates one field's worth of memory and binds
    // the reference as the receiver; the method re-anchors `this` from
    // its hidden first argument.
    let expected = "\
function Point.new 0
push constant 1
call Memory.alloc 1
pop pointer 0
push constant 0
pop this 0
push pointer 0
return
function Point.get 0
push argument 0
pop pointer 0
push this 0
return
";
    assert_eq!(vm, expected);
}

#[test]
fn test_compile_statements_and_branches() {
    let vm = compile_str(COUNTER).expect("compile error");

    let expected = "\
function Counter.new 0
push constant 1
call Memory.alloc 1
pop pointer 0
push argument 0
pop this 0
push pointer 0
return
function Counter.add 0
push argument 0
pop pointer 0
push this 0
push argument 1
add
pop this 0
push static 0
push argument 1
add
pop static 0
push constant 0
return
function Counter.countTo 1
push argument 0
pop pointer 0
push constant 0
pop local 0
label WHILE_COND_0
push local 0
push argument 1
lt
not
if-goto WHILE_END_0
push pointer 0
push constant 1
call Counter.add 2
pop temp 0
push local 0
push constant 1
add
pop local 0
goto WHILE_COND_0
label WHILE_END_0
push this 0
push argument 1
gt
not
if-goto IF_ELSE_1
push argument 1
return
goto IF_END_1
label IF_ELSE_1
push this 0
return
label IF_END_1
";
    assert_eq!(vm, expected);
}

#[test]
fn test_compile_arrays_and_strings() {
    let vm = compile_str(MAIN).expect("compile error");

    let expected = "\
function Main.main 2
push constant 3
call Array.new 1
pop local 0
push local 0
push constant 0
add
push constant 2
push local 1
push constant 1
add
call Math.multiply 2
pop temp 0
pop pointer 1
push temp 0
pop that 0
push local 0
push constant 0
add
pop pointer 1
push that 0
push constant 2
call Math.divide 2
pop local 1
push constant 2
call String.new 1
push constant 104
call String.appendChar 2
push constant 105
call String.appendChar 2
call Output.printString 1
pop temp 0
push constant 0
return
";
    assert_eq!(vm, expected);
}

#[test]
fn test_compile_keyword_constants_and_unary() {
    let source = "\
class Logic {
    function boolean flip(boolean b) {
        if (b = true) {
            return false;
        }
        return ~b;
    }

    function int negate(int n) {
        return -n;
    }
}
";
    let vm = compile_str(source).expect("compile error");

    let expected = "\
function Logic.flip 0
push argument 0
push constant 0
not
eq
not
if-goto IF_ELSE_0
push constant 0
return
goto IF_END_0
label IF_ELSE_0
label IF_END_0
push argument 0
not
return
function Logic.negate 0
push argument 0
neg
return
";
    assert_eq!(vm, expected);
}

#[test]
fn test_undeclared_variable_is_an_error() {
    let source = "\
class Broken {
    function void main() {
        let x = 1;
        return;
    }
}
";
    match compile_str(source) {
        Err(CompileError::UnknownVariable(name)) => assert_eq!(name, "x"),
        other => panic!("expected unknown variable error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_grammar_violation_is_an_error() {
    // Missing semicolon after the let statement.
    let source = "\
class Broken {
    function void main() {
        var int x;
        let x = 1
        return;
    }
}
";
    assert!(matches!(
        compile_str(source),
        Err(CompileError::Token(_))
    ));
}

#[test]
fn test_unterminated_string_is_fatal() {
    let source = "\
class Broken {
    function void main() {
        do Output.printString(\"oops);
        return;
    }
}
";
    assert!(compile_str(source).is_err());
}
