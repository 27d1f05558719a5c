use hello_lambda_http::{
    lambda::{lambda, Context, Error},
    IntoResponse, Request,
};

#[lambda(http)]
#[tokio::main]
async fn main(request: Request, context: Context) -> Result<impl IntoResponse, Error> {
    hello_lambda::function_handler(request, context).await
}
