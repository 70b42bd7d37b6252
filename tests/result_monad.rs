use kitchen_resilience::{
    collect, collect_all, combine, first_ok, result_api, safe, AppError, ErrorCode, ErrorInfo,
    ResultExt,
};
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn ok_and_err_basics() {
    for v in [0, 1, -7, i32::MAX] {
        let ok: Result<i32, ErrorInfo> = Ok(v);
        assert!(ok.is_ok());
        assert_eq!(ok.unwrap(), v);
    }
    let err: Result<i32, ErrorInfo> = Err(ErrorInfo::validation("bad servings"));
    assert!(err.is_err());
    assert_eq!(err.clone().unwrap_or(4), 4);
    assert_eq!(err.unwrap_or_else(|e| e.message().len() as i32), 12);
}

#[test]
#[should_panic(expected = "NOT_FOUND")]
fn unwrap_on_err_names_the_code() {
    let err: Result<(), ErrorInfo> = Err(ErrorInfo::not_found("Recipe", 42));
    err.unwrap();
}

#[test]
fn map_composition() {
    let f = |x: i32| x + 3;
    let g = |x: i32| x * 2;
    for v in [-2, 0, 5] {
        let ok: Result<i32, ErrorInfo> = Ok(v);
        assert_eq!(ok.clone().map(f).map(g), ok.map(|x| g(f(x))));
    }
}

#[test]
fn caught_transformations_turn_panics_into_internal_errors() {
    let ok: Result<u32, ErrorInfo> = Ok(3);
    let mapped = ok.clone().map_caught(|x| -> u32 {
        if x == 3 {
            panic!("scale overflowed");
        }
        x
    });
    let err = mapped.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InternalError);
    assert!(err.message().contains("scale overflowed"));

    let chained = ok.and_then_caught(|x| Ok::<_, ErrorInfo>(x * 2));
    assert_eq!(chained, Ok(6));
}

#[test]
fn taps_observe_without_changing_the_result() {
    let seen = AtomicUsize::new(0);
    let ok: Result<u32, ErrorInfo> = Ok(8);
    let after = ok
        .on_success(|v| {
            seen.fetch_add(*v as usize, Ordering::SeqCst);
        })
        .on_failure(|_| panic!("not called"));
    assert_eq!(after, Ok(8));
    assert_eq!(seen.load(Ordering::SeqCst), 8);

    let err: Result<u32, ErrorInfo> = Err(ErrorInfo::validation("x"));
    let after = err.clone().on_failure(|_| panic!("tap exploded"));
    assert_eq!(after, err);
}

#[test]
fn combine_and_collect() {
    assert_eq!(combine([Ok::<_, &str>(1), Ok(2), Ok(3)]), Ok(vec![1, 2, 3]));
    assert_eq!(combine([Ok(1), Err("x"), Ok(3)]), Err("x"));
    assert_eq!(kitchen_resilience::combine!(Ok::<_, &str>(1), Ok(2), Ok(3)), Ok(vec![1, 2, 3]));
    assert_eq!(collect(vec![Ok(1), Err("a"), Err("b")]), Err("a"));
}

#[test]
fn collect_all_keeps_order_and_never_short_circuits() {
    let (oks, errs) = collect_all(vec![Ok(1), Err("a"), Ok(3), Err("b")]);
    assert_eq!(oks, vec![1, 3]);
    assert_eq!(errs, vec!["a", "b"]);
}

#[test]
fn first_ok_returns_first_success_or_all_errors() {
    assert_eq!(first_ok([Err("a"), Ok(2), Ok(3)]), Ok(2));
    assert_eq!(first_ok::<i32, _, _>([Err("a"), Err("b")]), Err(vec!["a", "b"]));
    assert_eq!(kitchen_resilience::first_ok!(Err::<i32, _>("a"), Ok(5)), Ok(5));
}

#[test]
fn error_info_serializes_code_as_string() {
    let info = ErrorInfo::new(ErrorCode::InsufficientStock, "only 2 eggs left")
        .with_detail("item", "eggs")
        .with_source("inventory");
    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["code"], "INSUFFICIENT_STOCK");
    assert_eq!(json["message_for_user"], "only 2 eggs left");
    assert_eq!(json["details"]["item"], "eggs");

    let back: ErrorInfo = serde_json::from_value(json).unwrap();
    assert_eq!(back, info);
}

#[test]
fn safe_and_result_api_build_the_envelope() {
    let parsed = safe("recipe_import", || "12".parse::<u32>());
    assert_eq!(parsed, Ok(12));

    let failed = safe("recipe_import", || "twelve".parse::<u32>());
    let info = failed.clone().unwrap_err();
    assert_eq!(info.code(), ErrorCode::ValidationError);
    assert_eq!(info.origin(), "recipe_import");

    let envelope = serde_json::to_value(result_api(failed)).unwrap();
    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error"]["code"], "VALIDATION_ERROR");
    assert!(envelope.get("data").is_none());

    let envelope = serde_json::to_value(result_api(Ok::<_, ErrorInfo>(3))).unwrap();
    assert_eq!(envelope["success"], true);
    assert_eq!(envelope["data"], 3);
}

#[test]
fn app_errors_carry_their_codes() {
    let info: ErrorInfo = AppError::not_found("Ingredient", "saffron").into();
    assert_eq!(info.code(), ErrorCode::NotFound);
    assert_eq!(info.code().to_string(), "NOT_FOUND");
    assert!(ErrorCode::ALL.len() >= 20);
}
