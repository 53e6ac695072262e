use briny_attr::backprop::Tape;
use briny_attr::error::AttrError;
use briny_attr::{tensor, tensors::Tensor};

#[test]
fn test_tensor_creation() {
    let t = Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(t.shape, vec![2, 2]);
    assert_eq!(t.data, vec![1.0, 2.0, 3.0, 4.0]);
    assert!(!t.requires_grad());
    assert_eq!(t.batch_size(), 2);
}

#[test]
fn test_tensor_macro() {
    let t = tensor!([[1.0, 2.0], [3.0, 4.0]]);
    assert_eq!(t.shape, vec![2, 2]);
    assert_eq!(t.data, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_tensor_macro_negative_literals() {
    let t = tensor!([[1.0, -2.0], [-3.0, 4.0],]);
    assert_eq!(t.shape, vec![2, 2]);
    assert_eq!(t.data, vec![1.0, -2.0, -3.0, 4.0]);

    let s = tensor!(-0.5);
    assert!(s.shape.is_empty());
    assert_eq!(s.data, vec![-0.5]);

    let cube = tensor!([[[-1.0], [2.0]], [[3.0], [-4.0]]]);
    assert_eq!(cube.shape, vec![2, 2, 1]);
    assert_eq!(cube.data, vec![-1.0, 2.0, 3.0, -4.0]);
}

#[test]
fn test_tensor_shape_mismatch_panics() {
    let result = std::panic::catch_unwind(|| {
        Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0]);
    });
    assert!(result.is_err());
}

#[test]
fn test_try_new_reports_shape_mismatch() {
    let err = Tensor::try_new(vec![2, 2], vec![1.0, 2.0, 3.0]).unwrap_err();
    assert_eq!(
        err,
        AttrError::InvalidShape {
            shape: vec![2, 2],
            len: 3
        }
    );
}

#[test]
fn test_update_keeps_flag() {
    let mut t = tensor!([1.0, 2.0]).with_requires_grad(true);
    t.update(tensor!([3.0, 4.0]));
    assert_eq!(t.data, vec![3.0, 4.0]);
    assert!(t.requires_grad());
}

#[test]
fn test_matmul_backprop() {
    let a = Tensor::new(vec![2, 3], vec![
        1.0, 2.0, 3.0,
        4.0, 5.0, 6.0
    ]).with_requires_grad(true);
    let b = Tensor::new(vec![3, 2], vec![
        7.0, 8.0,
        9.0, 10.0,
        11.0, 12.0
    ]).with_requires_grad(true);

    let tape = Tape::new();
    let (av, bv) = (tape.input(&a), tape.input(&b));
    let out = tape.matmul(av, bv).unwrap();
    assert_eq!(tape.shape(out).unwrap(), vec![2, 2]);
    assert_eq!(tape.value(out).unwrap().data, vec![58.0, 64.0, 139.0, 154.0]);

    let grads = tape.backward(out, &Tensor::ones(vec![2, 2])).unwrap();
    assert_eq!(grads.wrt(av).unwrap().shape, vec![2, 3]);
    assert_eq!(grads.wrt(bv).unwrap().shape, vec![3, 2]);
}

#[test]
fn test_relu_backprop() {
    let t = Tensor::new(vec![3], vec![-1.0, 0.0, 1.0]).with_requires_grad(true);
    let tape = Tape::new();
    let v = tape.input(&t);
    let out = tape.relu(v).unwrap();
    assert_eq!(tape.value(out).unwrap().data, vec![0.0, 0.0, 1.0]);

    let grads = tape.backward(out, &Tensor::ones(vec![3])).unwrap();
    assert_eq!(grads.wrt(v).unwrap().data, vec![0.0, 0.0, 1.0]);
}

#[test]
fn test_foreign_var_is_rejected() {
    let other = Tape::new();
    for _ in 0..4 {
        other.constant(tensor!([1.0]));
    }
    let foreign = other.constant(tensor!([2.0]));

    let tape = Tape::new();
    let x = tape.input(&tensor!([1.0]).with_requires_grad(true));
    let unknown = AttrError::UnknownVar { index: 4, len: 1 };
    assert_eq!(tape.value(foreign).unwrap_err(), unknown);
    assert_eq!(tape.shape(foreign).unwrap_err(), unknown);
    assert_eq!(tape.is_tracked(foreign).unwrap_err(), unknown);
    assert_eq!(tape.relu(foreign).unwrap_err(), unknown);
    assert_eq!(tape.add(x, foreign).unwrap_err(), unknown);
    assert_eq!(
        tape.backward(foreign, &tensor!([1.0])).unwrap_err(),
        unknown
    );
}

#[test]
fn test_squared_error_backprop() {
    // mean((pred - target)^2) over two elements
    let pred = Tensor::new(vec![2], vec![1.0, 2.0]).with_requires_grad(true);
    let target = Tensor::new(vec![2], vec![1.5, 2.5]);

    let tape = Tape::new();
    let p = tape.input(&pred);
    let t = tape.constant(target);
    let diff = tape.sub(p, t).unwrap();
    let sq = tape.square(diff).unwrap();
    let total = tape.sum(sq).unwrap();
    let loss = tape.scale(total, 0.5).unwrap();
    assert_eq!(tape.value(loss).unwrap().data, vec![0.25]);

    let grads = tape.backward(loss, &tensor!(1.0)).unwrap();
    assert_eq!(grads.wrt(p).unwrap().data, vec![-0.5, -0.5]);
}
