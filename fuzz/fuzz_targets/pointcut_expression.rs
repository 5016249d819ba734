#![no_main]

use ferrous_beans::{Bean, BeanType, ExpressionPointcut, MethodSignature, Pointcut};
use libfuzzer_sys::fuzz_target;

trait Repository: Send + Sync {}

#[derive(Default)]
struct UserRepository;
impl Bean for UserRepository {}

fuzz_target!(|data: &[u8]| {
    let expression = match std::str::from_utf8(data) {
        Ok(expression) => expression,
        Err(_) => return,
    };

    // Parsing must never panic; a parsed pointcut must match without panicking.
    if let Ok(pointcut) = ExpressionPointcut::parse(expression) {
        assert_eq!(pointcut.expression(), expression);
        let ty = BeanType::builder::<UserRepository>()
            .default_constructor()
            .interface::<dyn Repository>()
            .build();
        let type_match = pointcut.matches_type(&ty);
        for arity in 0..3 {
            let method = MethodSignature::new("find_by_id", arity);
            let _ = type_match && pointcut.matches_method(&method, &ty);
        }
    }
});
